use ndarray::{ArrayViewD, Axis, Ix2};
use schema::RawDetection;
use std::fmt;
use std::str::FromStr;

/// Column holding the objectness score in Darknet rows.
const DARKNET_OBJECTNESS: usize = 4;

/// How a YOLO export lays out its output tensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModelLayout {
    /// `[1?, N, 5 + C]`: normalized `cx, cy, w, h`, objectness, then class
    /// scores. Darknet/OpenCV exports, one tensor per detection scale.
    #[default]
    Darknet,
    /// `[1, 4 + C, N]`: `cx, cy, w, h` in input pixels, then class scores.
    Ultralytics,
}

impl FromStr for ModelLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "darknet" | "yolov3" => Ok(ModelLayout::Darknet),
            "ultralytics" | "yolov8" => Ok(ModelLayout::Ultralytics),
            other => Err(format!(
                "{other} is not a supported model layout. Use either `darknet` or `ultralytics`."
            )),
        }
    }
}

impl fmt::Display for ModelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelLayout::Darknet => f.write_str("darknet"),
            ModelLayout::Ultralytics => f.write_str("ultralytics"),
        }
    }
}

/// Decode one output tensor into raw candidate records.
///
/// `input_size` is the detector input as (width, height) and is only used to
/// normalize Ultralytics pixel coordinates.
pub fn decode(
    output: &ArrayViewD<f32>,
    layout: ModelLayout,
    input_size: (u32, u32),
) -> anyhow::Result<Vec<RawDetection>> {
    // Drop the batch axis when present
    let output = match output.ndim() {
        2 => output.view(),
        3 if output.shape()[0] == 1 => output.index_axis(Axis(0), 0),
        _ => anyhow::bail!(
            "Unexpected output shape {:?} for {} layout",
            output.shape(),
            layout
        ),
    };
    let rows = output.into_dimensionality::<Ix2>()?;

    match layout {
        ModelLayout::Darknet => decode_darknet(rows),
        ModelLayout::Ultralytics => decode_ultralytics(rows, input_size),
    }
}

fn decode_darknet(rows: ndarray::ArrayView2<f32>) -> anyhow::Result<Vec<RawDetection>> {
    let columns = rows.ncols();
    if columns <= DARKNET_OBJECTNESS + 1 {
        anyhow::bail!("Darknet rows need at least 6 columns, got {}", columns);
    }

    Ok(rows
        .rows()
        .into_iter()
        .map(|row| {
            RawDetection::new(
                row[0],
                row[1],
                row[2],
                row[3],
                row.iter().skip(DARKNET_OBJECTNESS + 1).copied().collect(),
            )
        })
        .collect())
}

fn decode_ultralytics(
    rows: ndarray::ArrayView2<f32>,
    input_size: (u32, u32),
) -> anyhow::Result<Vec<RawDetection>> {
    if rows.nrows() <= 4 {
        anyhow::bail!(
            "Ultralytics output needs at least 5 rows, got {}",
            rows.nrows()
        );
    }
    let (input_width, input_height) = (input_size.0 as f32, input_size.1 as f32);

    // Candidates are columns
    Ok(rows
        .columns()
        .into_iter()
        .map(|col| {
            RawDetection::new(
                col[0] / input_width,
                col[1] / input_height,
                col[2] / input_width,
                col[3] / input_height,
                col.iter().skip(4).copied().collect(),
            )
        })
        .collect())
}
