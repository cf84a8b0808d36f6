// src/landmark.rs
use nalgebra::{Vector2, Vector3};

/// A single hand landmark in full-frame pixel coordinates.
///
/// `x` and `y` are pixels, `z` is the detector's relative depth cue and is not scaled.
pub type Landmark = Vector3<f64>;

/// Number of landmarks the detector reports per hand.
pub const HAND_LANDMARK_COUNT: usize = 21;

// MediaPipe hand landmark indices
pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_FINGER_MCP: usize = 5;
pub const INDEX_FINGER_PIP: usize = 6;
pub const INDEX_FINGER_DIP: usize = 7;
pub const INDEX_FINGER_TIP: usize = 8;
pub const MIDDLE_FINGER_MCP: usize = 9;
pub const MIDDLE_FINGER_PIP: usize = 10;
pub const MIDDLE_FINGER_DIP: usize = 11;
pub const MIDDLE_FINGER_TIP: usize = 12;
pub const RING_FINGER_MCP: usize = 13;
pub const RING_FINGER_PIP: usize = 14;
pub const RING_FINGER_DIP: usize = 15;
pub const RING_FINGER_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// Skeleton topology over the landmark indices, for renderers.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (WRIST, THUMB_CMC),
    (THUMB_CMC, THUMB_MCP),
    (THUMB_MCP, THUMB_IP),
    (THUMB_IP, THUMB_TIP),
    (WRIST, INDEX_FINGER_MCP),
    (INDEX_FINGER_MCP, INDEX_FINGER_PIP),
    (INDEX_FINGER_PIP, INDEX_FINGER_DIP),
    (INDEX_FINGER_DIP, INDEX_FINGER_TIP),
    (INDEX_FINGER_MCP, MIDDLE_FINGER_MCP),
    (MIDDLE_FINGER_MCP, MIDDLE_FINGER_PIP),
    (MIDDLE_FINGER_PIP, MIDDLE_FINGER_DIP),
    (MIDDLE_FINGER_DIP, MIDDLE_FINGER_TIP),
    (MIDDLE_FINGER_MCP, RING_FINGER_MCP),
    (RING_FINGER_MCP, RING_FINGER_PIP),
    (RING_FINGER_PIP, RING_FINGER_DIP),
    (RING_FINGER_DIP, RING_FINGER_TIP),
    (RING_FINGER_MCP, PINKY_MCP),
    (PINKY_MCP, PINKY_PIP),
    (PINKY_PIP, PINKY_DIP),
    (PINKY_DIP, PINKY_TIP),
    (WRIST, PINKY_MCP),
];

/// The view of the source frame a candidate was detected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Full,
    LeftHalf,
    RightHalf,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Full, Region::LeftHalf, Region::RightHalf];

    /// Horizontal offset of this region's crop inside a frame of the given width.
    pub fn x_offset(self, frame_width: u32) -> f64 {
        match self {
            Region::Full | Region::LeftHalf => 0.0,
            Region::RightHalf => f64::from(frame_width / 2),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Region::Full => "full",
            Region::LeftHalf => "left-half",
            Region::RightHalf => "right-half",
        }
    }
}

/// Axis-aligned box given by its top-left and bottom-right corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub top_left: Vector2<f64>,
    pub bottom_right: Vector2<f64>,
}

impl BoundingBox {
    pub fn new(top_left: Vector2<f64>, bottom_right: Vector2<f64>) -> Self {
        Self {
            top_left,
            bottom_right,
        }
    }

    /// Smallest box enclosing every landmark, ignoring depth.
    pub fn enclosing(landmarks: &[Landmark]) -> Option<Self> {
        let first = landmarks.first()?;
        let mut min = first.xy();
        let mut max = first.xy();
        for lm in &landmarks[1..] {
            min = min.inf(&lm.xy());
            max = max.sup(&lm.xy());
        }
        Some(Self::new(min, max))
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        let delta = Vector2::new(dx, dy);
        Self::new(self.top_left + delta, self.bottom_right + delta)
    }

    pub fn width(&self) -> f64 {
        self.bottom_right.x - self.top_left.x
    }

    pub fn height(&self) -> f64 {
        self.bottom_right.y - self.top_left.y
    }
}

/// A detection as returned by the detector, in the coordinate space of the crop it ran on.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub landmarks: Vec<Landmark>,
    pub confidence: f64,
    pub bounding_box: BoundingBox,
}

/// One detected hand in full-frame coordinates, tagged with the region it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub landmarks: Vec<Landmark>,
    pub confidence: f64,
    pub bounding_box: BoundingBox,
    pub source_region: Region,
}

impl Candidate {
    pub fn wrist(&self) -> Option<&Landmark> {
        self.landmarks.get(WRIST)
    }

    pub fn wrist_x(&self) -> Option<f64> {
        self.wrist().map(|w| w.x)
    }

    /// Whether this candidate satisfies the detector's 21-landmark contract.
    pub fn is_complete(&self) -> bool {
        self.landmarks.len() == HAND_LANDMARK_COUNT
    }

    /// 2-D distance between the wrists of two candidates, if both have one.
    pub fn wrist_distance(&self, other: &Candidate) -> Option<f64> {
        let a = self.wrist()?;
        let b = other.wrist()?;
        Some((a.xy() - b.xy()).norm())
    }
}
