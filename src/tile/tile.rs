use serde::{Deserialize, Serialize};

/// 麻将牌类型
///
/// 台湾十六张麻将使用 144 张牌：
/// 万、筒、条各 36 张（1-9 各 4 张），风牌 16 张，三元牌 12 张，
/// 花牌 8 张（四花 + 四季）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tile {
    /// 万子（1-9，共 36 张）
    Wan(u8),
    /// 筒子（1-9，共 36 张）
    Tong(u8),
    /// 条子（1-9，共 36 张）
    Tiao(u8),
    /// 风牌（东南西北，各 4 张）
    Wind(Wind),
    /// 三元牌（中发白，各 4 张）
    Dragon(Dragon),
    /// 花牌（梅兰竹菊，各 1 张）
    Flower(u8),
    /// 季牌（春夏秋冬，各 1 张）
    Season(u8),
}

/// 数牌花色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    Wan = 0,
    Tong = 1,
    Tiao = 2,
}

impl Suit {
    /// 所有数牌花色
    pub fn all() -> [Suit; 3] {
        [Suit::Wan, Suit::Tong, Suit::Tiao]
    }
}

/// 风牌（同时用作座风/圈风）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Wind {
    East = 0,
    South = 1,
    West = 2,
    North = 3,
}

impl Wind {
    pub fn all() -> [Wind; 4] {
        [Wind::East, Wind::South, Wind::West, Wind::North]
    }

    /// 从索引创建（0=东 1=南 2=西 3=北）
    pub fn from_index(index: u8) -> Option<Wind> {
        match index {
            0 => Some(Wind::East),
            1 => Some(Wind::South),
            2 => Some(Wind::West),
            3 => Some(Wind::North),
            _ => None,
        }
    }

    /// 下一个风位（东→南→西→北→东）
    pub fn next(self) -> Wind {
        Wind::from_index(((self as u8) + 1) % 4).unwrap_or(Wind::East)
    }
}

/// 三元牌
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dragon {
    Red = 0,
    Green = 1,
    White = 2,
}

impl Dragon {
    pub fn all() -> [Dragon; 3] {
        [Dragon::Red, Dragon::Green, Dragon::White]
    }
}

impl Tile {
    /// 总牌数：144 张
    pub const TOTAL_COUNT: usize = 144;

    /// 非花牌数：136 张
    pub const NON_BONUS_COUNT: usize = 136;

    /// 花牌数：8 张
    pub const BONUS_COUNT: usize = 8;

    /// 非花牌的种类数：27 种数牌 + 4 种风 + 3 种三元 = 34
    pub const KIND_COUNT: usize = 34;

    /// 数牌的数字范围：1-9
    pub const MIN_RANK: u8 = 1;
    pub const MAX_RANK: u8 = 9;

    /// 创建一张数牌，验证输入有效性
    pub fn suited(suit: Suit, rank: u8) -> Option<Self> {
        if !(Self::MIN_RANK..=Self::MAX_RANK).contains(&rank) {
            return None;
        }
        Some(match suit {
            Suit::Wan => Tile::Wan(rank),
            Suit::Tong => Tile::Tong(rank),
            Suit::Tiao => Tile::Tiao(rank),
        })
    }

    /// 获取数牌花色（字牌和花牌返回 None）
    pub fn suit(&self) -> Option<Suit> {
        match self {
            Tile::Wan(_) => Some(Suit::Wan),
            Tile::Tong(_) => Some(Suit::Tong),
            Tile::Tiao(_) => Some(Suit::Tiao),
            _ => None,
        }
    }

    /// 获取数牌数字（字牌和花牌返回 None）
    pub fn rank(&self) -> Option<u8> {
        match self {
            Tile::Wan(r) | Tile::Tong(r) | Tile::Tiao(r) => Some(*r),
            _ => None,
        }
    }

    /// 是否为字牌（风牌或三元牌）
    pub fn is_honor(&self) -> bool {
        matches!(self, Tile::Wind(_) | Tile::Dragon(_))
    }

    /// 是否为花牌（花/季，摸到需补牌，单独计台）
    pub fn is_bonus(&self) -> bool {
        matches!(self, Tile::Flower(_) | Tile::Season(_))
    }

    /// 是否为幺九牌（数牌 1/9 或字牌），十三幺的组成牌
    pub fn is_orphan(&self) -> bool {
        match self {
            Tile::Wan(r) | Tile::Tong(r) | Tile::Tiao(r) => *r == 1 || *r == 9,
            Tile::Wind(_) | Tile::Dragon(_) => true,
            _ => false,
        }
    }

    /// 转换为种类索引（0-33，花牌返回 None）
    ///
    /// 映射规则：
    /// - 万子：0-8
    /// - 筒子：9-17
    /// - 条子：18-26
    /// - 风牌：27-30（东南西北）
    /// - 三元：31-33（中发白）
    pub fn kind_index(&self) -> Option<usize> {
        match self {
            Tile::Wan(r) => Some((*r - 1) as usize),
            Tile::Tong(r) => Some(9 + (*r - 1) as usize),
            Tile::Tiao(r) => Some(18 + (*r - 1) as usize),
            Tile::Wind(w) => Some(27 + *w as usize),
            Tile::Dragon(d) => Some(31 + *d as usize),
            _ => None,
        }
    }

    /// 从种类索引创建牌（0-33）
    pub fn from_kind_index(index: usize) -> Option<Self> {
        match index {
            0..=8 => Some(Tile::Wan(index as u8 + 1)),
            9..=17 => Some(Tile::Tong((index - 9) as u8 + 1)),
            18..=26 => Some(Tile::Tiao((index - 18) as u8 + 1)),
            27..=30 => Wind::from_index((index - 27) as u8).map(Tile::Wind),
            31 => Some(Tile::Dragon(Dragon::Red)),
            32 => Some(Tile::Dragon(Dragon::Green)),
            33 => Some(Tile::Dragon(Dragon::White)),
            _ => None,
        }
    }

    /// 检查三张牌是否可以组成顺子（连续同花色）
    pub fn can_form_sequence(&self, other1: &Tile, other2: &Tile) -> bool {
        let (Some(s0), Some(s1), Some(s2)) = (self.suit(), other1.suit(), other2.suit()) else {
            return false;
        };
        if s0 != s1 || s0 != s2 {
            return false;
        }
        let mut ranks = [
            self.rank().unwrap_or(0),
            other1.rank().unwrap_or(0),
            other2.rank().unwrap_or(0),
        ];
        ranks.sort_unstable();
        ranks[0] + 1 == ranks[1] && ranks[1] + 1 == ranks[2]
    }

    /// 生成一副完整的 144 张牌（未洗）
    ///
    /// 非花牌每种 4 张，花牌每种 1 张
    pub fn full_set() -> Vec<Tile> {
        let mut tiles = Vec::with_capacity(Self::TOTAL_COUNT);
        for kind in 0..Self::KIND_COUNT {
            let tile = Tile::from_kind_index(kind).expect("kind index in range");
            for _ in 0..4 {
                tiles.push(tile);
            }
        }
        for n in 1..=4 {
            tiles.push(Tile::Flower(n));
            tiles.push(Tile::Season(n));
        }
        tiles
    }

    /// 幺九牌的 13 个种类（十三幺所需）
    pub fn orphan_kinds() -> [Tile; 13] {
        [
            Tile::Wan(1),
            Tile::Wan(9),
            Tile::Tong(1),
            Tile::Tong(9),
            Tile::Tiao(1),
            Tile::Tiao(9),
            Tile::Wind(Wind::East),
            Tile::Wind(Wind::South),
            Tile::Wind(Wind::West),
            Tile::Wind(Wind::North),
            Tile::Dragon(Dragon::Red),
            Tile::Dragon(Dragon::Green),
            Tile::Dragon(Dragon::White),
        ]
    }
}
