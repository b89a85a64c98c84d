//! # Message Protocol
//!
//! Defines the messages exchanged between RPC clients and servers:
//! - Remote method calls addressed as `"<ClassName>.<method>"`
//! - Replies carrying either nothing, a JSON value, an image frame or an error
//!
//! Messages are serialized to JSON and sent over TCP with a 4-byte length prefix.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};

// ============================================================================
// MESSAGE TYPES
// ============================================================================

/// Core message enum for all RPC communication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Message {
    /// **Call Message**
    ///
    /// Sent by a client to invoke a remotely exported method.
    ///
    /// # Fields
    /// - `name`: Call name following the `ClassName.method` convention
    /// - `args`: Positional arguments, as JSON values
    Call {
        name: String,
        args: Vec<serde_json::Value>,
    },

    /// **Reply Message**
    ///
    /// The server's answer to exactly one `Call`.
    Reply(Payload),
}

/// Body of a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// Nothing to return. Also the "absent image" sentinel.
    Empty,
    /// A plain JSON value.
    Value(serde_json::Value),
    /// A raw image frame.
    Image(Frame),
    /// The call failed on the server side.
    Error(String),
}

impl Message {
    /// Serialize a message to JSON bytes for transmission over the network.
    ///
    /// # Example
    /// ```ignore
    /// let msg = Message::Call { name: "ImageServer.read".into(), args: vec![] };
    /// let bytes = msg.to_bytes()?;
    /// ```
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Deserialize a message from JSON bytes received from the network.
    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

// ============================================================================
// FRAME
// ============================================================================

/// An uncompressed, interleaved 8-bit image.
///
/// Pixel data travels as base64 text inside the JSON envelope, which keeps
/// large frames roughly 4/3 of their raw size instead of one JSON number per
/// byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Interleaved channels per pixel (1 = gray, 3 = RGB, 4 = RGBA)
    pub channels: u8,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl Frame {
    /// Build a frame, checking that `data` matches the declared geometry.
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Option<Self> {
        let frame = Self {
            width,
            height,
            channels,
            data,
        };
        frame.is_valid().then_some(frame)
    }

    /// Whether `data` holds exactly `width * height * channels` bytes.
    ///
    /// Frames decoded from the wire are not checked; receivers call this.
    pub fn is_valid(&self) -> bool {
        self.channels != 0
            && expected_len(self.width, self.height, self.channels) == Some(self.data.len())
    }

    /// Convert any decoded image into an RGB frame.
    pub fn from_image(image: &DynamicImage) -> Self {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        Self {
            width,
            height,
            channels: 3,
            data: rgb.into_raw(),
        }
    }

    /// View this frame as an `image` buffer, when its layout allows it.
    pub fn to_image(&self) -> Option<DynamicImage> {
        match self.channels {
            1 => image::GrayImage::from_raw(self.width, self.height, self.data.clone())
                .map(DynamicImage::ImageLuma8),
            3 => RgbImage::from_raw(self.width, self.height, self.data.clone())
                .map(DynamicImage::ImageRgb8),
            4 => image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
                .map(DynamicImage::ImageRgba8),
            _ => None,
        }
    }
}

fn expected_len(width: u32, height: u32, channels: u8) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(channels as usize)
}

mod base64_bytes {
    use super::{Engine, STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_geometry_is_checked() {
        assert!(Frame::new(2, 2, 3, vec![0; 12]).is_some());
        assert!(Frame::new(2, 2, 3, vec![0; 11]).is_none());
        assert!(Frame::new(2, 2, 0, vec![]).is_none());
    }

    #[test]
    fn test_huge_geometry_is_rejected() {
        assert!(Frame::new(u32::MAX, u32::MAX, 255, vec![]).is_none());
        assert!(Frame::new(u32::MAX, u32::MAX, 1, vec![0; 4]).is_none());
    }

    #[test]
    fn test_decoded_frame_can_be_invalid() {
        let bytes = br#"{"Reply":{"Image":{"width":10,"height":10,"channels":3,"data":""}}}"#;
        match Message::from_bytes(bytes).unwrap() {
            Message::Reply(Payload::Image(frame)) => assert!(!frame.is_valid()),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_image_reply_survives_the_wire() {
        let frame = Frame::new(3, 1, 1, vec![0, 127, 255]).unwrap();
        let bytes = Message::Reply(Payload::Image(frame.clone())).to_bytes().unwrap();

        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("AH//"), "pixel data should be base64: {}", text);

        match Message::from_bytes(&bytes).unwrap() {
            Message::Reply(Payload::Image(decoded)) => assert_eq!(decoded, frame),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_frame_converts_from_image() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 2, image::Rgb([1, 2, 3])));
        let frame = Frame::from_image(&img);
        assert_eq!((frame.width, frame.height, frame.channels), (4, 2, 3));
        assert_eq!(&frame.data[..3], &[1, 2, 3]);
        assert_eq!(frame.to_image().unwrap().to_rgb8(), img.to_rgb8());
    }
}
