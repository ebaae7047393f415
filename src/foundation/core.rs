use crate::foundation::error::{DotlinkError, DotlinkResult};

/// Integer pixel coordinate on the canvas.
///
/// Points are immutable once sampled and identified by their index in sample order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance. Exact for any on-canvas pair.
    pub fn distance_sq(self, other: Point) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx * dx + dy * dy
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.distance_sq(other) as f64).sqrt()
    }

    pub fn to_kurbo(self) -> kurbo::Point {
        kurbo::Point::new(f64::from(self.x), f64::from(self.y))
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
        }
    }
}

/// Opaque RGB color.
///
/// Serialized as a 3-element array; any other length is rejected at deserialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Vec<u8>", into = "[u8; 3]")]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const BLACK: Rgb8 = Rgb8::new(0, 0, 0);
    pub const WHITE: Rgb8 = Rgb8::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }

    pub fn from_slice(v: &[u8]) -> DotlinkResult<Self> {
        match *v {
            [r, g, b] => Ok(Self { r, g, b }),
            _ => Err(DotlinkError::validation(format!(
                "color must have exactly 3 components, got {}",
                v.len()
            ))),
        }
    }
}

impl TryFrom<Vec<u8>> for Rgb8 {
    type Error = DotlinkError;

    fn try_from(v: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_slice(&v)
    }
}

impl From<Rgb8> for [u8; 3] {
    fn from(c: Rgb8) -> Self {
        [c.r, c.g, c.b]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_symmetric_and_exact() {
        let a = Point::new(100, 100);
        let b = Point::new(103, 104);
        assert_eq!(a.distance_sq(b), 25);
        assert_eq!(b.distance_sq(a), 25);
        assert_eq!(a.distance(b), 5.0);
    }

    #[test]
    fn color_rejects_wrong_arity() {
        assert!(Rgb8::from_slice(&[1, 2]).is_err());
        assert!(Rgb8::from_slice(&[1, 2, 3, 4]).is_err());
        assert_eq!(Rgb8::from_slice(&[1, 2, 3]).unwrap(), Rgb8::new(1, 2, 3));
    }

    #[test]
    fn color_serializes_as_array() {
        let s = serde_json::to_string(&Rgb8::new(50, 50, 200)).unwrap();
        assert_eq!(s, "[50,50,200]");
        assert!(serde_json::from_str::<Rgb8>("[1,2]").is_err());
    }
}
