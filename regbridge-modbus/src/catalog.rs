//! Channel catalog and read planning.
//!
//! A catalog is the ordered list of channels a device exposes. Its order is
//! the order measurements are emitted in, and the read plan coalesces
//! adjacent channels with the same layout into one register request.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::decoder::{Encoding, WordOrder};

/// Largest number of registers a single holding-register request may cover.
pub const MAX_REGISTERS_PER_READ: u16 = 125;

/// Errors raised while building a catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog has no channels")]
    Empty,

    #[error("channel #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("channel '{name}' at address {address} runs past the last register")]
    AddressOverflow { name: String, address: u16 },

    #[error("channels '{first}' and '{second}' share registers")]
    Overlap { first: String, second: String },
}

/// One named measurement read from the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Starting holding-register address.
    pub address: u16,
    /// Measurement name, e.g. `Temp(200)`.
    pub name: String,
    /// Physical unit, possibly empty.
    #[serde(default)]
    pub unit: String,
    /// How the registers combine into a value.
    pub encoding: Encoding,
    /// Word order for 2-register encodings.
    #[serde(default)]
    pub word_order: WordOrder,
}

impl Channel {
    pub fn new(
        address: u16,
        name: impl Into<String>,
        unit: impl Into<String>,
        encoding: Encoding,
        word_order: WordOrder,
    ) -> Self {
        Self {
            address,
            name: name.into(),
            unit: unit.into(),
            encoding,
            word_order,
        }
    }

    /// Number of registers this channel occupies.
    pub fn register_count(&self) -> u16 {
        self.encoding.words_per_value()
    }

    /// One past the last register this channel occupies.
    pub fn end_address(&self) -> u32 {
        u32::from(self.address) + u32::from(self.register_count())
    }
}

/// A single holding-register request covering a run of channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadBlock {
    /// First register to read.
    pub address: u16,
    /// Number of registers to read.
    pub count: u16,
    /// Encoding shared by every channel in the block.
    pub encoding: Encoding,
    /// Word order shared by every channel in the block.
    pub word_order: WordOrder,
    /// Catalog indices the block's values map to, in order.
    pub channels: Range<usize>,
}

impl ReadBlock {
    /// Number of decoded values a complete response yields.
    pub fn expected_values(&self) -> usize {
        self.channels.len()
    }
}

/// Ordered list of channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    channels: Vec<Channel>,
    level_index: Option<usize>,
}

impl Catalog {
    /// Build a catalog, rejecting empty names and overlapping registers.
    pub fn new(channels: Vec<Channel>) -> Result<Self, CatalogError> {
        if channels.is_empty() {
            return Err(CatalogError::Empty);
        }

        for (index, channel) in channels.iter().enumerate() {
            if channel.name.trim().is_empty() {
                return Err(CatalogError::EmptyName { index });
            }
            if channel.end_address() > u32::from(u16::MAX) + 1 {
                return Err(CatalogError::AddressOverflow {
                    name: channel.name.clone(),
                    address: channel.address,
                });
            }
        }

        let mut by_address: Vec<&Channel> = channels.iter().collect();
        by_address.sort_by_key(|c| c.address);
        for pair in by_address.windows(2) {
            if u32::from(pair[1].address) < pair[0].end_address() {
                return Err(CatalogError::Overlap {
                    first: pair[0].name.clone(),
                    second: pair[1].name.clone(),
                });
            }
        }

        Ok(Self::from_channels(channels))
    }

    fn from_channels(channels: Vec<Channel>) -> Self {
        let level_index = channels.iter().rposition(|c| c.encoding.is_integer());
        Self {
            channels,
            level_index,
        }
    }

    /// The 19-channel layout of the water-quality datalogger.
    ///
    /// Eighteen reverse-ordered floats at 199..=233 followed by the level
    /// switch as a single register at 235.
    pub fn datalogger() -> Self {
        const FLOATS: [(&str, &str); 18] = [
            ("Temp(200)", "degC"),
            ("TURBIDITY(202)", "NTU"),
            ("PH(204)", "ph"),
            ("DEPTH(206)", "m"),
            ("COND(208)", "uS/cm"),
            ("nLfCond(210)", "uS/cm"),
            ("DO(212)", "%sat"),
            ("DO(214)", "%cb"),
            ("DO(216)", "mg/L"),
            ("ORP(218)", "mV"),
            ("PRESSURE(220)", "psia"),
            ("SAL(222)", "psu"),
            ("Sp Cond(224)", "uS/cm"),
            ("TDS(226)", "mg/L"),
            ("TSS(228)", "mg/L"),
            ("PH(230)", "mV"),
            ("CABLEPOWER(232)", "volt"),
            ("Bat(234)", "V"),
        ];

        let mut channels: Vec<Channel> = FLOATS
            .iter()
            .zip((199u16..).step_by(2))
            .map(|(&(name, unit), address)| {
                Channel::new(address, name, unit, Encoding::Float32, WordOrder::Reverse)
            })
            .collect();
        channels.push(Channel::new(
            235,
            "Level(236)",
            "",
            Encoding::Int16,
            WordOrder::Standard,
        ));

        Self::from_channels(channels)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn get(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    /// Index of the level channel: the last integer-encoded channel.
    pub fn level_index(&self) -> Option<usize> {
        self.level_index
    }

    /// The level channel, if the catalog has an integer channel.
    pub fn level_channel(&self) -> Option<&Channel> {
        self.level_index.and_then(|i| self.channels.get(i))
    }

    /// Group channels into as few register requests as possible.
    ///
    /// Consecutive catalog entries are merged while they share an encoding
    /// and word order, sit back to back in the register map, and the block
    /// stays within [`MAX_REGISTERS_PER_READ`]. Catalog order is preserved,
    /// so concatenating the blocks' values yields one value per channel.
    pub fn read_plan(&self) -> Vec<ReadBlock> {
        let mut blocks: Vec<ReadBlock> = Vec::new();

        for (index, channel) in self.channels.iter().enumerate() {
            let words = channel.register_count();

            if let Some(block) = blocks.last_mut() {
                let contiguous =
                    u32::from(block.address) + u32::from(block.count) == u32::from(channel.address);
                if contiguous
                    && block.encoding == channel.encoding
                    && block.word_order == channel.word_order
                    && block.count + words <= MAX_REGISTERS_PER_READ
                {
                    block.count += words;
                    block.channels.end = index + 1;
                    continue;
                }
            }

            blocks.push(ReadBlock {
                address: channel.address,
                count: words,
                encoding: channel.encoding,
                word_order: channel.word_order,
                channels: index..index + 1,
            });
        }

        blocks
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::datalogger()
    }
}
