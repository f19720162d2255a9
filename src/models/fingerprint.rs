//! 256 bit 感知哈希及距离
//!
//! 哈希按大端存放，字节数组的字典序就是整数的大小顺序，
//! 两种距离(算术差、汉明距离)统一用 [`Distance`] 表示。

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const FINGERPRINT_BYTES: usize = 32;
pub const FINGERPRINT_BITS: usize = FINGERPRINT_BYTES * 8;

/// 距离计算方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// |a - b|，和按 ABS(hash - query) 建好的库兼容
    #[default]
    Arithmetic,
    /// popcount(a ^ b)
    Hamming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fingerprint([u8; FINGERPRINT_BYTES]);

impl Fingerprint {
    pub const ZERO: Fingerprint = Fingerprint([0u8; FINGERPRINT_BYTES]);

    pub fn from_bytes(bytes: [u8; FINGERPRINT_BYTES]) -> Self {
        Fingerprint(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_BYTES] {
        &self.0
    }

    /// 按顺序把 bit 从低位移入，第一个 bit 最终落在最高有效位。
    /// 和把 bit 串当作二进制数解析的结果一致。
    pub fn from_bits<I: IntoIterator<Item = bool>>(bits: I) -> Result<Self> {
        let mut value = Fingerprint::ZERO;
        let mut count = 0usize;
        for bit in bits {
            count += 1;
            if count > FINGERPRINT_BITS {
                return Err(anyhow!("fingerprint wider than {FINGERPRINT_BITS} bits"));
            }
            value.shl1();
            if bit {
                value.0[FINGERPRINT_BYTES - 1] |= 1;
            }
        }
        Ok(value)
    }

    pub fn from_u128(v: u128) -> Self {
        let mut bytes = [0u8; FINGERPRINT_BYTES];
        bytes[16..].copy_from_slice(&v.to_be_bytes());
        Fingerprint(bytes)
    }

    /// 第 i 位，0 为最低位
    pub fn bit(&self, i: usize) -> bool {
        if i >= FINGERPRINT_BITS {
            return false;
        }
        let byte = self.0[FINGERPRINT_BYTES - 1 - i / 8];
        (byte >> (i % 8)) & 1 == 1
    }

    pub fn count_ones(&self) -> u32 {
        self.0.iter().map(|b| b.count_ones()).sum()
    }

    pub fn hamming(&self, other: &Fingerprint) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    /// 两个整数差的绝对值
    pub fn abs_diff(&self, other: &Fingerprint) -> Distance {
        let (big, small) = if self >= other { (self, other) } else { (other, self) };
        let mut out = [0u8; FINGERPRINT_BYTES];
        let mut borrow = 0i16;
        for i in (0..FINGERPRINT_BYTES).rev() {
            let mut d = big.0[i] as i16 - small.0[i] as i16 - borrow;
            if d < 0 {
                d += 256;
                borrow = 1;
            } else {
                borrow = 0;
            }
            out[i] = d as u8;
        }
        Distance(out)
    }

    pub fn distance(&self, other: &Fingerprint, metric: DistanceMetric) -> Distance {
        match metric {
            DistanceMetric::Arithmetic => self.abs_diff(other),
            DistanceMetric::Hamming => Distance::from(self.hamming(other)),
        }
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn shl1(&mut self) {
        let mut carry = 0u8;
        for byte in self.0.iter_mut().rev() {
            let next = *byte >> 7;
            *byte = (*byte << 1) | carry;
            carry = next;
        }
    }
}

impl FromStr for Fingerprint {
    type Err = anyhow::Error;

    /// 不足 64 位的十六进制串右对齐，和整数解析一致
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.is_empty() || s.len() > FINGERPRINT_BYTES * 2 {
            return Err(anyhow!("invalid fingerprint length: {}", s.len()));
        }
        let mut bytes = [0u8; FINGERPRINT_BYTES];
        for (i, c) in s.chars().rev().enumerate() {
            let nibble = c
                .to_digit(16)
                .ok_or_else(|| anyhow!("invalid hex digit {c:?} in fingerprint"))? as u8;
            bytes[FINGERPRINT_BYTES - 1 - i / 2] |= nibble << (4 * (i % 2));
        }
        Ok(Fingerprint(bytes))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 非负 256 bit 距离，可直接比较大小
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Distance([u8; FINGERPRINT_BYTES]);

impl Distance {
    pub const ZERO: Distance = Distance([0u8; FINGERPRINT_BYTES]);

    pub fn is_zero(&self) -> bool {
        *self == Distance::ZERO
    }

    /// 能放进 u64 时返回数值
    pub fn to_u64(&self) -> Option<u64> {
        if self.0[..FINGERPRINT_BYTES - 8].iter().any(|&b| b != 0) {
            return None;
        }
        let mut tail = [0u8; 8];
        tail.copy_from_slice(&self.0[FINGERPRINT_BYTES - 8..]);
        Some(u64::from_be_bytes(tail))
    }
}

impl From<u32> for Distance {
    fn from(v: u32) -> Self {
        let mut bytes = [0u8; FINGERPRINT_BYTES];
        bytes[FINGERPRINT_BYTES - 4..].copy_from_slice(&v.to_be_bytes());
        Distance(bytes)
    }
}

impl fmt::Display for Distance {
    /// 十进制，按字节做长除法
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut n = self.0;
        let mut digits = Vec::new();
        while n.iter().any(|&b| b != 0) {
            let mut rem = 0u32;
            for byte in n.iter_mut() {
                let cur = (rem << 8) | *byte as u32;
                *byte = (cur / 10) as u8;
                rem = cur % 10;
            }
            digits.push(rem as u8);
        }
        if digits.is_empty() {
            return f.write_str("0");
        }
        let text: String = digits.iter().rev().map(|d| char::from(b'0' + d)).collect();
        f.write_str(&text)
    }
}

/// 统一序列化成十进制字符串，256 bit 放不进 JSON 数字
impl Serialize for Distance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
