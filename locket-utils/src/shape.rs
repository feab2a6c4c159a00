//! Crop shape geometry shared by the editor viewport and the print sheet.
//!
//! Provides the `CropShape` enum together with helpers that turn a shape and a
//! bounding box into a closed `tiny_skia` path.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tiny_skia::{Path, PathBuilder, Rect};

/// Width:height ratio of the oval crop. Preview and export must agree on it exactly.
pub const OVAL_ASPECT_RATIO: f32 = 0.7;

/// Width of the normalized space the heart silhouette is authored in.
const HEART_SPACE_WIDTH: f32 = 32.0;
/// Height of the normalized space the heart silhouette is authored in.
const HEART_SPACE_HEIGHT: f32 = 29.6;

/// Start point of the heart outline (the bottom tip).
const HEART_START: (f32, f32) = (16.0, 29.6);

/// Cubic segments of the heart outline as `(control1, control2, end)` triples.
const HEART_SEGMENTS: [[(f32, f32); 3]; 6] = [
    [(4.2, 17.2), (0.0, 13.3), (0.0, 8.4)],
    [(0.0, 3.8), (3.8, 0.0), (8.4, 0.0)],
    [(11.8, 0.0), (14.8, 2.1), (16.0, 5.1)],
    [(17.2, 2.1), (20.2, 0.0), (23.6, 0.0)],
    [(28.2, 0.0), (32.0, 3.8), (32.0, 8.4)],
    [(32.0, 13.3), (27.8, 17.2), (16.0, 29.6)],
];

/// Shapes a photo can be cropped into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum CropShape {
    #[default]
    Square,
    Circle,
    Oval,
    Heart,
}

impl CropShape {
    /// Every supported shape, in the order the editor offers them.
    pub const ALL: [CropShape; 4] = [
        CropShape::Square,
        CropShape::Circle,
        CropShape::Oval,
        CropShape::Heart,
    ];

    /// Width:height ratio a cell of this shape is locked to.
    pub fn aspect_ratio(self) -> f32 {
        match self {
            CropShape::Oval => OVAL_ASPECT_RATIO,
            CropShape::Square | CropShape::Circle | CropShape::Heart => 1.0,
        }
    }

    /// Lenient lookup used for user-supplied values: unknown names become `Square`.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CropShape::Square => "square",
            CropShape::Circle => "circle",
            CropShape::Oval => "oval",
            CropShape::Heart => "heart",
        }
    }
}

impl fmt::Display for CropShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CropShape {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "square" => Ok(CropShape::Square),
            "circle" => Ok(CropShape::Circle),
            "oval" => Ok(CropShape::Oval),
            "heart" => Ok(CropShape::Heart),
            other => Err(format!(
                "unknown crop shape '{other}'; expected square, circle, oval or heart"
            )),
        }
    }
}

/// Axis-aligned bounding box a shape is fitted into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ShapeBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box anchored at the origin.
    pub fn sized(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    fn is_degenerate(&self) -> bool {
        !(self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }
}

/// Build the clip path for `shape` inside `bbox` as the editor frame draws it.
///
/// The oval keeps its full height but compresses its horizontal radius to
/// [`OVAL_ASPECT_RATIO`] of half the box width, so a square frame shows a
/// portrait oval. Returns `None` only for empty or non-finite boxes.
pub fn build_clip_path(shape: CropShape, bbox: ShapeBox) -> Option<Path> {
    if bbox.is_degenerate() {
        return None;
    }

    match shape {
        CropShape::Oval => {
            let rx = (bbox.width / 2.0) * OVAL_ASPECT_RATIO;
            let ry = bbox.height / 2.0;
            ellipse_path(bbox.center(), rx, ry)
        }
        _ => build_cell_path(shape, bbox),
    }
}

/// Build the clip path for a print cell.
///
/// Cells are already aspect-locked to [`CropShape::aspect_ratio`], so the oval
/// is the ellipse inscribed in the box. All other shapes match
/// [`build_clip_path`].
pub fn build_cell_path(shape: CropShape, bbox: ShapeBox) -> Option<Path> {
    if bbox.is_degenerate() {
        return None;
    }

    match shape {
        CropShape::Square => Rect::from_xywh(bbox.x, bbox.y, bbox.width, bbox.height)
            .map(PathBuilder::from_rect),
        CropShape::Circle => {
            let (cx, cy) = bbox.center();
            PathBuilder::from_circle(cx, cy, bbox.width.min(bbox.height) / 2.0)
        }
        CropShape::Oval => ellipse_path(bbox.center(), bbox.width / 2.0, bbox.height / 2.0),
        CropShape::Heart => heart_path(bbox),
    }
}

fn ellipse_path((cx, cy): (f32, f32), rx: f32, ry: f32) -> Option<Path> {
    let rect = Rect::from_xywh(cx - rx, cy - ry, rx * 2.0, ry * 2.0)?;
    PathBuilder::from_oval(rect)
}

/// Scale the normalized heart into `bbox`, top edge on `bbox.y`.
fn heart_path(bbox: ShapeBox) -> Option<Path> {
    let scale_x = bbox.width / HEART_SPACE_WIDTH;
    let scale_y = bbox.height / HEART_SPACE_HEIGHT;
    let map = |(x, y): (f32, f32)| (x.mul_add(scale_x, bbox.x), y.mul_add(scale_y, bbox.y));

    let mut builder = PathBuilder::new();
    let (start_x, start_y) = map(HEART_START);
    builder.move_to(start_x, start_y);
    for [c1, c2, end] in HEART_SEGMENTS {
        let (x1, y1) = map(c1);
        let (x2, y2) = map(c2);
        let (x, y) = map(end);
        builder.cubic_to(x1, y1, x2, y2, x, y);
    }
    builder.close();
    builder.finish()
}
