use schema::TransformedDetection;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const DETECTIONS_FILE_NAME: &str = "DetectionsFile.txt";

/// Every transformed detection of a run, in frame order.
///
/// Object ids are positions in the log, so they run across frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionLog {
    entries: Vec<TransformedDetection>,
}

impl DetectionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a detection and return its object id.
    pub fn push(&mut self, detection: TransformedDetection) -> usize {
        self.entries.push(detection);
        self.entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TransformedDetection] {
        &self.entries
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for (object_id, d) in self.entries.iter().enumerate() {
            writeln!(
                writer,
                "FrameID: {} ObjectID: {} Box_Coordinates: {} {} {} {}",
                d.frame_id,
                object_id,
                d.top_left.0,
                d.top_left.1,
                d.bottom_right.0,
                d.bottom_right.1
            )?;
        }
        writer.flush()
    }

    /// Write `DetectionsFile.txt` into `dir`, replacing any previous one.
    pub fn save(&self, dir: impl AsRef<Path>) -> io::Result<PathBuf> {
        let path = dir.as_ref().join(DETECTIONS_FILE_NAME);
        let file = File::create(&path)?;
        self.write_to(BufWriter::new(file))?;
        Ok(path)
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub detections: DetectionLog,
}
