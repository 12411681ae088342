//! Position of a shape in the (Z-section, time-point, channel) space.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::UNSET_CHANNEL;

/// A (z, t, c) coordinate within an image stack.
///
/// Two shapes of one ROI may not share the same z-section and time-point;
/// the channel is advisory and never takes part in that check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord3D {
    /// Z-section index
    pub z: u32,
    /// Time-point index
    pub t: u32,
    /// Channel index, [`UNSET_CHANNEL`] when not set
    #[serde(default = "unset_channel")]
    pub c: i32,
}

fn unset_channel() -> i32 {
    UNSET_CHANNEL
}

impl Coord3D {
    /// Create a coordinate without a channel.
    pub const fn new(z: u32, t: u32) -> Self {
        Self {
            z,
            t,
            c: UNSET_CHANNEL,
        }
    }

    /// Set the channel.
    pub const fn with_channel(mut self, c: i32) -> Self {
        self.c = c;
        self
    }

    /// Channel index if one is set.
    pub fn channel(&self) -> Option<u32> {
        u32::try_from(self.c).ok()
    }

    /// The plane (z, t) this coordinate lies on.
    pub const fn plane(&self) -> Plane {
        Plane {
            z: self.z,
            t: self.t,
        }
    }
}

impl Default for Coord3D {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl fmt::Display for Coord3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(z={}, t={}, c={})", self.z, self.t, self.c)
    }
}

/// Uniqueness key of a shape within its ROI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Plane {
    /// Z-section index
    pub z: u32,
    /// Time-point index
    pub t: u32,
}

impl From<Coord3D> for Plane {
    fn from(coord: Coord3D) -> Self {
        coord.plane()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_is_advisory() {
        let a = Coord3D::new(1, 2);
        let b = Coord3D::new(1, 2).with_channel(3);
        assert_ne!(a, b);
        assert_eq!(a.plane(), b.plane());
        assert_eq!(a.channel(), None);
        assert_eq!(b.channel(), Some(3));
    }

    #[test]
    fn test_plane_ordering() {
        let mut planes = vec![
            Coord3D::new(1, 0).plane(),
            Coord3D::new(0, 5).plane(),
            Coord3D::new(0, 1).plane(),
        ];
        planes.sort();
        assert_eq!(
            planes,
            vec![Plane { z: 0, t: 1 }, Plane { z: 0, t: 5 }, Plane { z: 1, t: 0 }]
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Coord3D::new(4, 2).to_string(), "(z=4, t=2, c=-1)");
    }
}
