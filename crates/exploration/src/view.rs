//! Map viewport and raster display parameters.

use serde::{Deserialize, Serialize};
use urlstate::ParamCodec;

pub const DEFAULT_CENTER: [f64; 2] = [0.0, 0.0];
pub const DEFAULT_ZOOM: f64 = 1.0;
pub const DEFAULT_COLOR_MAP: &str = "viridis";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Default,
    Simple,
}

/// Value range a raster colormap is stretched over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorMapScale {
    pub min: f64,
    pub max: f64,
}

impl ColorMapScale {
    /// `None` unless both bounds are finite and `min <= max`.
    pub fn new(min: f64, max: f64) -> Option<Self> {
        (min.is_finite() && max.is_finite() && min <= max).then_some(Self { min, max })
    }
}

/// Current viewport and display settings, read from the session's URL
/// stores.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewParams {
    pub center: [f64; 2],
    pub zoom: f64,
    pub color_map: String,
    pub color_map_scale: Option<ColorMapScale>,
    pub view_mode: ViewMode,
    pub is_embedded: bool,
    pub reverse_color_map: bool,
}

fn parse_finite(raw: &str) -> Result<f64, String> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("`{raw}` is not a finite number"))
}

/// Six-decimal URL form of one coordinate. Negative zero prints as zero.
fn coordinate_text(v: f64) -> String {
    let text = format!("{v:.6}");
    match text.as_str() {
        "-0.000000" => "0.000000".to_string(),
        _ => text,
    }
}

/// `"lng,lat"` with six decimals. Brackets around the pair are tolerated.
#[derive(Debug, Clone, Copy)]
pub struct CenterCodec {
    pub default: [f64; 2],
}

impl Default for CenterCodec {
    fn default() -> Self {
        Self {
            default: DEFAULT_CENTER,
        }
    }
}

impl ParamCodec for CenterCodec {
    type Value = [f64; 2];

    fn initial(&self) -> [f64; 2] {
        self.default
    }

    fn try_hydrate(&self, raw: &str) -> Result<[f64; 2], String> {
        let inner = raw.trim().trim_start_matches('[').trim_end_matches(']');
        let parts: Vec<&str> = inner.split(',').collect();
        let [lng, lat] = parts.as_slice() else {
            return Err(format!("expected two coordinates, got {}", parts.len()));
        };
        Ok([parse_finite(lng)?, parse_finite(lat)?])
    }

    fn dehydrate(&self, value: &[f64; 2]) -> String {
        if self.are_equal(value, &self.default) {
            return String::new();
        }
        format!("{},{}", coordinate_text(value[0]), coordinate_text(value[1]))
    }

    /// Equal when both print the same at the six decimals the URL keeps.
    fn are_equal(&self, a: &[f64; 2], b: &[f64; 2]) -> bool {
        a.iter().zip(b).all(|(x, y)| coordinate_text(*x) == coordinate_text(*y))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ZoomCodec {
    pub default: f64,
}

impl Default for ZoomCodec {
    fn default() -> Self {
        Self {
            default: DEFAULT_ZOOM,
        }
    }
}

impl ParamCodec for ZoomCodec {
    type Value = f64;

    fn initial(&self) -> f64 {
        self.default
    }

    fn try_hydrate(&self, raw: &str) -> Result<f64, String> {
        parse_finite(raw)
    }

    fn dehydrate(&self, value: &f64) -> String {
        if *value == self.default {
            String::new()
        } else {
            value.to_string()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColorMapCodec {
    pub default: String,
}

impl Default for ColorMapCodec {
    fn default() -> Self {
        Self {
            default: DEFAULT_COLOR_MAP.to_string(),
        }
    }
}

impl ParamCodec for ColorMapCodec {
    type Value = String;

    fn initial(&self) -> String {
        self.default.clone()
    }

    fn try_hydrate(&self, raw: &str) -> Result<String, String> {
        Ok(raw.to_string())
    }

    fn dehydrate(&self, value: &String) -> String {
        if *value == self.default {
            String::new()
        } else {
            value.clone()
        }
    }
}

/// `"min,max"`; absent means the renderer's own rescale.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorMapScaleCodec {
    pub default: Option<ColorMapScale>,
}

impl ParamCodec for ColorMapScaleCodec {
    type Value = Option<ColorMapScale>;

    fn initial(&self) -> Option<ColorMapScale> {
        self.default
    }

    fn try_hydrate(&self, raw: &str) -> Result<Option<ColorMapScale>, String> {
        let Some((min, max)) = raw.split_once(',') else {
            return Err("expected `min,max`".to_string());
        };
        let (min, max) = (parse_finite(min)?, parse_finite(max)?);
        ColorMapScale::new(min, max)
            .map(Some)
            .ok_or_else(|| format!("inverted scale {min} > {max}"))
    }

    fn dehydrate(&self, value: &Option<ColorMapScale>) -> String {
        match value {
            Some(scale) if *value != self.default => format!("{},{}", scale.min, scale.max),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ViewModeCodec;

impl ParamCodec for ViewModeCodec {
    type Value = ViewMode;

    fn initial(&self) -> ViewMode {
        ViewMode::Default
    }

    /// Anything other than `simple` is the default mode.
    fn try_hydrate(&self, raw: &str) -> Result<ViewMode, String> {
        Ok(match raw {
            "simple" => ViewMode::Simple,
            _ => ViewMode::Default,
        })
    }

    fn dehydrate(&self, value: &ViewMode) -> String {
        match value {
            ViewMode::Simple => "simple".to_string(),
            ViewMode::Default => String::new(),
        }
    }
}

/// Boolean written as `"true"` and omitted when false. `"false"` still reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlagCodec;

impl ParamCodec for FlagCodec {
    type Value = bool;

    fn initial(&self) -> bool {
        false
    }

    fn try_hydrate(&self, raw: &str) -> Result<bool, String> {
        match raw {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(format!("`{other}` is not a boolean")),
        }
    }

    fn dehydrate(&self, value: &bool) -> String {
        if *value {
            "true".to_string()
        } else {
            String::new()
        }
    }
}
