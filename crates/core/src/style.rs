//! The catalog of styles the transformation service understands.
//!
//! The service matches the `tema` field against these exact strings, so
//! [`StyleId::as_str`] is part of the wire contract and must not change.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A style the remote service can apply to a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StyleId {
    #[serde(rename = "Estúdio Ghibli")]
    Ghibli,
    #[serde(rename = "Boobie Goods")]
    BoobieGoods,
    #[serde(rename = "Pixel-Art")]
    PixelArt,
    #[serde(rename = "Cyberpunk")]
    Cyberpunk,
    #[serde(rename = "Pistache")]
    Pistache,
    #[serde(rename = "Vintage")]
    Vintage,
    #[serde(rename = "Preto e Branco")]
    BlackAndWhite,
}

impl StyleId {
    /// Every style, in the order the catalog presents them.
    pub const ALL: [StyleId; 7] = [
        StyleId::Ghibli,
        StyleId::BoobieGoods,
        StyleId::PixelArt,
        StyleId::Cyberpunk,
        StyleId::Pistache,
        StyleId::Vintage,
        StyleId::BlackAndWhite,
    ];

    /// The exact string sent to the service.
    pub fn as_str(self) -> &'static str {
        match self {
            StyleId::Ghibli => "Estúdio Ghibli",
            StyleId::BoobieGoods => "Boobie Goods",
            StyleId::PixelArt => "Pixel-Art",
            StyleId::Cyberpunk => "Cyberpunk",
            StyleId::Pistache => "Pistache",
            StyleId::Vintage => "Vintage",
            StyleId::BlackAndWhite => "Preto e Branco",
        }
    }

    /// ASCII short name accepted on the command line.
    pub fn slug(self) -> &'static str {
        match self {
            StyleId::Ghibli => "ghibli",
            StyleId::BoobieGoods => "boobie-goods",
            StyleId::PixelArt => "pixel-art",
            StyleId::Cyberpunk => "cyberpunk",
            StyleId::Pistache => "pistache",
            StyleId::Vintage => "vintage",
            StyleId::BlackAndWhite => "preto-e-branco",
        }
    }
}

impl fmt::Display for StyleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StyleId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        StyleId::ALL
            .into_iter()
            .find(|style| style.as_str() == trimmed || style.slug().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| AppError::config(format!("Unknown style: {}", trimmed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names_and_slugs() {
        assert_eq!("Pixel-Art".parse::<StyleId>().unwrap(), StyleId::PixelArt);
        assert_eq!("Estúdio Ghibli".parse::<StyleId>().unwrap(), StyleId::Ghibli);
        assert_eq!("PRETO-E-BRANCO".parse::<StyleId>().unwrap(), StyleId::BlackAndWhite);
        assert_eq!(" vintage ".parse::<StyleId>().unwrap(), StyleId::Vintage);
    }

    #[test]
    fn rejects_unknown_style() {
        let err = "watercolor".parse::<StyleId>().unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("watercolor")));
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&StyleId::BlackAndWhite).unwrap();
        assert_eq!(json, "\"Preto e Branco\"");
        for style in StyleId::ALL {
            let encoded = serde_json::to_string(&style).unwrap();
            assert_eq!(encoded, format!("\"{}\"", style.as_str()));
        }
    }
}
