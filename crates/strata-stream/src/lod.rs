use std::fmt;
use strata_mesh::{MeshError, validate_lod};
use strata_world::{GenSettings, LodInfo, StreamingConfig};

#[derive(Clone, Debug, PartialEq)]
pub enum StreamError {
    EmptyLodTable,
    /// Threshold at `index` is not finite and positive.
    InvalidThreshold { index: usize },
    /// Threshold at `index` does not exceed the previous one.
    UnsortedThresholds { index: usize },
    MultipleColliders { first: usize, second: usize },
    InvalidLod { index: usize, source: MeshError },
    /// Threshold at `index` would need a window wider than [`MAX_VIEW_RADIUS`] chunks.
    ViewTooFar { index: usize, radius: f32 },
}

/// Widest streaming window, in chunks from the viewer's chunk.
pub const MAX_VIEW_RADIUS: i32 = 64;

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::EmptyLodTable => write!(f, "lod table is empty"),
            StreamError::InvalidThreshold { index } => {
                write!(f, "lod {} has a non-positive view distance", index)
            }
            StreamError::UnsortedThresholds { index } => write!(
                f,
                "lod {} view distance must exceed the previous entry",
                index
            ),
            StreamError::MultipleColliders { first, second } => write!(
                f,
                "lods {} and {} are both marked for collision",
                first, second
            ),
            StreamError::InvalidLod { index, source } => {
                write!(f, "lod {} cannot be meshed: {}", index, source)
            }
            StreamError::ViewTooFar { index, radius } => write!(
                f,
                "lod {} view distance spans {} chunks (limit {})",
                index, radius, MAX_VIEW_RADIUS
            ),
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StreamError::InvalidLod { source, .. } => Some(source),
            _ => None,
        }
    }
}

// Chunk centers sit `interior - 1` samples apart.
fn window_radius(distance: f32, interior: usize) -> f32 {
    (distance / interior.saturating_sub(1).max(1) as f32).ceil()
}

/// Validated detail levels, nearest first.
#[derive(Clone, Debug, PartialEq)]
pub struct LodTable {
    levels: Vec<LodInfo>,
    collider: Option<usize>,
}

impl LodTable {
    /// `interior` is the number of mesh samples per chunk edge.
    pub fn new(levels: Vec<LodInfo>, interior: usize) -> Result<Self, StreamError> {
        if levels.is_empty() {
            return Err(StreamError::EmptyLodTable);
        }
        let mut collider = None;
        for (index, info) in levels.iter().enumerate() {
            let t = info.visible_dist_threshold;
            if !(t.is_finite() && t > 0.0) {
                return Err(StreamError::InvalidThreshold { index });
            }
            if index > 0 && t <= levels[index - 1].visible_dist_threshold {
                return Err(StreamError::UnsortedThresholds { index });
            }
            if info.use_for_collider {
                if let Some(first) = collider {
                    return Err(StreamError::MultipleColliders {
                        first,
                        second: index,
                    });
                }
                collider = Some(index);
            }
            validate_lod(interior, info.lod)
                .map_err(|source| StreamError::InvalidLod { index, source })?;
            let radius = window_radius(t, interior);
            if radius > MAX_VIEW_RADIUS as f32 {
                return Err(StreamError::ViewTooFar { index, radius });
            }
        }
        Ok(Self { levels, collider })
    }

    /// Table for `streaming` checked against the chunk size of `settings`.
    pub fn for_settings(settings: &GenSettings, streaming: &StreamingConfig) -> Result<Self, StreamError> {
        Self::new(streaming.lods.clone(), settings.map_chunk_size())
    }

    /// Chunks the window must extend from the viewer's chunk to cover every level.
    #[inline]
    pub fn view_radius(&self, interior: usize) -> i32 {
        window_radius(self.max_view_distance(), interior) as i32
    }

    #[inline]
    pub fn levels(&self) -> &[LodInfo] {
        &self.levels
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&LodInfo> {
        self.levels.get(index)
    }

    #[inline]
    pub fn collider_index(&self) -> Option<usize> {
        self.collider
    }

    /// The coarsest level's threshold; nothing farther is shown.
    #[inline]
    pub fn max_view_distance(&self) -> f32 {
        self.levels
            .last()
            .map(|l| l.visible_dist_threshold)
            .unwrap_or(0.0)
    }

    /// Index of the first level whose threshold covers `sqr_distance`, else the coarsest.
    pub fn select(&self, sqr_distance: f32) -> usize {
        let last = self.levels.len().saturating_sub(1);
        self.levels[..last]
            .iter()
            .position(|l| sqr_distance <= l.visible_dist_threshold * l.visible_dist_threshold)
            .unwrap_or(last)
    }
}
