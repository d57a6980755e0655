//! Locate the occupancy channel inside a reference dataset.
//!
//! Reference feeds mix price, booking-count and occupancy series under
//! ambiguous channel ordering, so the channel is inferred from its values:
//!
//! 1. primary section, requested category first, then every other category:
//!    accept a category when its first channel looks like realistic occupancy
//!    (at least `min_realistic` of the first `sample_size` values lie in
//!    `(0, 100]` and are not whole numbers);
//! 2. secondary section (when configured): requested category first, then the
//!    rest, scanning *every* channel for one whose sampled mean lies in `(0, 100]`;
//! 3. the requested category in the primary section, channel 0, unchanged;
//! 4. otherwise `NotFound`.
//!
//! The whole-number rejection is tuned against one observed feed shape and
//! can misclassify valid data; it is kept as-is until a feed proves otherwise.

use serde_json::Value;

use crate::data::reference::{CategoryBlock, ReferenceDataset, cell_number};
use crate::domain::Entity;

pub const DEFAULT_PRIMARY_SECTION: &str = "future_daily";
pub const DEFAULT_SECONDARY_SECTION: &str = "historical_monthly";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorConfig {
    pub primary_section: String,
    pub secondary_section: Option<String>,
    pub sample_size: usize,
    pub min_realistic: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            primary_section: DEFAULT_PRIMARY_SECTION.to_string(),
            secondary_section: Some(DEFAULT_SECONDARY_SECTION.to_string()),
            sample_size: 20,
            min_realistic: 5,
        }
    }
}

/// How a channel stores its cells. Decided once when the channel is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    /// `channel[i]` is the value.
    Flat,
    /// `channel[i]` is an array; the value is `channel[i][0]`.
    Nested,
}

impl ChannelLayout {
    pub fn detect(channel: &[Value]) -> Self {
        match channel.iter().find(|v| !v.is_null()) {
            Some(Value::Array(_)) => ChannelLayout::Nested,
            _ => ChannelLayout::Flat,
        }
    }

    /// Numeric value at `idx`, honoring the layout.
    pub fn value_at(self, channel: &[Value], idx: usize) -> Option<f64> {
        let cell = channel.get(idx)?;
        match self {
            ChannelLayout::Flat => cell_number(cell),
            ChannelLayout::Nested => cell.as_array()?.first().and_then(cell_number),
        }
    }
}

/// Which rule selected the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    RealisticPrimary,
    SecondaryChannelScan,
    RequestedFallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocatedChannel<'a> {
    pub section: &'a str,
    pub category: &'a str,
    pub channel: usize,
    pub layout: ChannelLayout,
    pub detection: Detection,
    pub block: &'a CategoryBlock,
}

impl LocatedChannel<'_> {
    pub fn values(&self) -> &[Value] {
        self.block.channel(self.channel).unwrap_or(&[])
    }

    pub fn value_at(&self, idx: usize) -> Option<f64> {
        self.layout.value_at(self.values(), idx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// Neither the primary nor the secondary section is present.
    NoRecognizedSection,
    /// The recognized sections hold no category with data.
    NoCategories,
    /// Categories exist but none carries a plausible occupancy channel.
    NoPlausibleChannel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocateOutcome<'a> {
    Found(LocatedChannel<'a>),
    NotFound(NotFoundReason),
}

/// Pick the category id an entity should be compared against.
pub trait CategoryMatcher: Send + Sync {
    fn match_category(&self, entity: &Entity, dataset: &ReferenceDataset) -> Option<String>;
}

/// First category id in `section` (or, failing that, in any section).
///
/// Placeholder until real location/size matching exists.
#[derive(Debug, Clone)]
pub struct FirstAvailableCategory {
    pub section: String,
}

impl Default for FirstAvailableCategory {
    fn default() -> Self {
        Self {
            section: DEFAULT_PRIMARY_SECTION.to_string(),
        }
    }
}

impl CategoryMatcher for FirstAvailableCategory {
    fn match_category(&self, _entity: &Entity, dataset: &ReferenceDataset) -> Option<String> {
        dataset
            .section(&self.section)
            .and_then(|s| s.keys().next())
            .or_else(|| dataset.sections.values().find_map(|s| s.keys().next()))
            .cloned()
    }
}

/// Find the `(section, category, channel)` that plausibly encodes occupancy.
pub fn locate<'a>(
    dataset: &'a ReferenceDataset,
    category_id: &str,
    config: &LocatorConfig,
) -> LocateOutcome<'a> {
    let primary = dataset
        .sections
        .get_key_value(config.primary_section.as_str());
    let secondary = config
        .secondary_section
        .as_deref()
        .and_then(|name| dataset.sections.get_key_value(name));

    if primary.is_none() && secondary.is_none() {
        return LocateOutcome::NotFound(NotFoundReason::NoRecognizedSection);
    }

    if let Some((section, blocks)) = primary {
        let candidates = requested_first(blocks, category_id);
        for (category, block) in candidates {
            if is_realistic_occupancy(block, config) {
                tracing::debug!(section = %section, category = %category, "realistic occupancy in primary section");
                return found(section, category, 0, block, Detection::RealisticPrimary);
            }
        }
    }

    if let Some((section, blocks)) = secondary {
        for (category, block) in requested_first(blocks, category_id) {
            if let Some(channel) = plausible_channel(block, config) {
                tracing::debug!(section = %section, category = %category, channel, "occupancy channel in secondary section");
                return found(section, category, channel, block, Detection::SecondaryChannelScan);
            }
        }
    }

    if let Some((section, blocks)) = primary {
        if let Some((category, block)) = blocks.get_key_value(category_id) {
            if !block.is_empty() {
                tracing::debug!(section = %section, category = %category, "falling back to requested category");
                return found(section, category, 0, block, Detection::RequestedFallback);
            }
        }
    }

    let any_data = primary
        .into_iter()
        .chain(secondary)
        .any(|(_, blocks)| blocks.values().any(|b| !b.is_empty()));
    let reason = if any_data {
        NotFoundReason::NoPlausibleChannel
    } else {
        NotFoundReason::NoCategories
    };
    LocateOutcome::NotFound(reason)
}

fn found<'a>(
    section: &'a str,
    category: &'a str,
    channel: usize,
    block: &'a CategoryBlock,
    detection: Detection,
) -> LocateOutcome<'a> {
    let layout = block
        .channel(channel)
        .map(ChannelLayout::detect)
        .unwrap_or(ChannelLayout::Flat);
    LocateOutcome::Found(LocatedChannel {
        section,
        category,
        channel,
        layout,
        detection,
        block,
    })
}

fn requested_first<'a>(
    blocks: &'a std::collections::BTreeMap<String, CategoryBlock>,
    category_id: &str,
) -> Vec<(&'a str, &'a CategoryBlock)> {
    let mut out = Vec::with_capacity(blocks.len());
    if let Some((k, v)) = blocks.get_key_value(category_id) {
        out.push((k.as_str(), v));
    }
    out.extend(
        blocks
            .iter()
            .filter(|(k, _)| k.as_str() != category_id)
            .map(|(k, v)| (k.as_str(), v)),
    );
    out
}

fn sample(block: &CategoryBlock, channel: usize, size: usize) -> Vec<f64> {
    let Some(values) = block.channel(channel) else {
        return Vec::new();
    };
    let layout = ChannelLayout::detect(values);
    (0..values.len().min(size))
        .filter_map(|i| layout.value_at(values, i))
        .collect()
}

/// First channel holds fractional values in `(0, 100]` often enough.
fn is_realistic_occupancy(block: &CategoryBlock, config: &LocatorConfig) -> bool {
    let qualifying = sample(block, 0, config.sample_size)
        .into_iter()
        .filter(|v| *v > 0.0 && *v <= 100.0 && v.fract() != 0.0)
        .count();
    qualifying >= config.min_realistic
}

/// First channel whose sampled mean lies in `(0, 100]`.
fn plausible_channel(block: &CategoryBlock, config: &LocatorConfig) -> Option<usize> {
    (0..block.channels.len()).find(|&c| {
        let values = sample(block, c, config.sample_size);
        if values.is_empty() {
            return false;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        mean > 0.0 && mean <= 100.0
    })
}
