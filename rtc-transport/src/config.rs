//! Payload type and header extension configuration.
//!
//! Configuration arrives either as a typed [`TransportConfig`] (usually
//! loaded from JSON) or as flat dotted [`Properties`]:
//!
//! ```text
//! audio.opus.pt   = 111
//! video.vp8.pt    = 96
//! video.vp8.rtx   = 97
//! video.flexfec.pt = 98
//! ext.urn:ietf:params:rtp-hdrext:ssrc-audio-level = 1
//! mtu = 1200
//! ```

use std::collections::BTreeMap;

use log::{info, warn};
use rtp::extension::{ExtensionKind, ExtensionMap};
use serde::{Deserialize, Serialize};
use shared::error::{Error, Result};

use crate::rtp_map::{Codec, MediaType, RtpMap};

pub const DEFAULT_MTU: usize = 1500;
/// Payload types occupy 7 bits of the RTP header.
pub const MAX_PAYLOAD_TYPE: u8 = 127;

/// Flat ordered string properties with dotted keys.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, String>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Properties below `prefix`, with `prefix.` stripped from their keys.
    pub fn children(&self, prefix: &str) -> Properties {
        let dotted = format!("{prefix}.");
        Properties(
            self.0
                .iter()
                .filter_map(|(k, v)| {
                    k.strip_prefix(dotted.as_str())
                        .map(|rest| (rest.to_owned(), v.clone()))
                })
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Properties(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecMapping {
    pub codec: Codec,
    pub payload_type: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtx_payload_type: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub audio_codecs: Vec<CodecMapping>,
    pub video_codecs: Vec<CodecMapping>,
    pub flexfec_payload_type: Option<u8>,
    /// Header extension ids keyed by extension URI.
    pub extensions: BTreeMap<String, u8>,
    pub mtu: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            audio_codecs: vec![],
            video_codecs: vec![],
            flexfec_payload_type: None,
            extensions: BTreeMap::new(),
            mtu: DEFAULT_MTU,
        }
    }
}

impl TransportConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| Error::ErrConfig(err.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|err| Error::ErrConfig(err.to_string()))
    }

    pub fn from_properties(properties: &Properties) -> Result<Self> {
        let mut config = TransportConfig::default();

        config.audio_codecs = codec_mappings(&properties.children("audio"), MediaType::Audio)?;
        config.video_codecs = codec_mappings(&properties.children("video"), MediaType::Video)?;

        if let Some(pt) = properties.get("video.flexfec.pt") {
            config.flexfec_payload_type = Some(parse_payload_type("video.flexfec.pt", pt)?);
        }

        for (uri, id) in properties.children("ext").iter() {
            if ExtensionKind::from_uri(uri).is_none() {
                warn!("ignoring unknown header extension {uri}");
                continue;
            }
            let id = parse_number(&format!("ext.{uri}"), id)?;
            config.extensions.insert(uri.to_owned(), id);
        }

        if let Some(mtu) = properties.get("mtu") {
            config.mtu = parse_number("mtu", mtu)?;
        }

        Ok(config)
    }

    /// Builds the payload type map and the header extension map.
    pub fn build_maps(&self) -> Result<(RtpMap, ExtensionMap)> {
        let mut rtp_map = RtpMap::new();
        for mapping in self.audio_codecs.iter().chain(self.video_codecs.iter()) {
            check_payload_type(mapping.codec.name(), mapping.payload_type)?;
            if let Some(rtx) = mapping.rtx_payload_type {
                check_payload_type(mapping.codec.name(), rtx)?;
            }
            rtp_map.insert(mapping.payload_type, mapping.codec);
            if let Some(rtx) = mapping.rtx_payload_type {
                rtp_map.insert_rtx(rtx, mapping.payload_type);
            }
        }
        if let Some(pt) = self.flexfec_payload_type {
            check_payload_type(Codec::Flexfec.name(), pt)?;
            rtp_map.insert(pt, Codec::Flexfec);
        }

        let mut ext_map = ExtensionMap::new();
        for (uri, id) in &self.extensions {
            match ExtensionKind::from_uri(uri) {
                Some(kind) => ext_map.insert(*id, kind)?,
                None => warn!("ignoring unknown header extension {uri}"),
            }
        }

        info!(
            "configured {} audio and {} video codecs, {} header extensions",
            self.audio_codecs.len(),
            self.video_codecs.len(),
            self.extensions.len()
        );

        Ok((rtp_map, ext_map))
    }
}

fn codec_mappings(properties: &Properties, media_type: MediaType) -> Result<Vec<CodecMapping>> {
    let mut by_codec: BTreeMap<Codec, (Option<u8>, Option<u8>)> = BTreeMap::new();

    for (key, value) in properties.iter() {
        let Some((name, field)) = key.split_once('.') else {
            warn!("ignoring {media_type} property {key}");
            continue;
        };
        let codec = match name.parse::<Codec>() {
            Ok(Codec::Flexfec) | Ok(Codec::Rtx) => continue,
            Ok(codec) => codec,
            Err(_) => {
                warn!("ignoring unknown {media_type} codec {name}");
                continue;
            }
        };

        let full_key = format!("{media_type}.{key}");
        let entry = by_codec.entry(codec).or_default();
        match field {
            "pt" => entry.0 = Some(parse_payload_type(&full_key, value)?),
            "rtx" => entry.1 = Some(parse_payload_type(&full_key, value)?),
            _ => warn!("ignoring {media_type} property {key}"),
        }
    }

    let mut mappings = vec![];
    for (codec, (pt, rtx)) in by_codec {
        match pt {
            Some(payload_type) => mappings.push(CodecMapping {
                codec,
                payload_type,
                rtx_payload_type: rtx,
            }),
            None => warn!("{media_type} codec {codec} has no payload type"),
        }
    }
    Ok(mappings)
}

fn parse_payload_type(key: &str, value: &str) -> Result<u8> {
    let pt = parse_number(key, value)?;
    check_payload_type(key, pt)?;
    Ok(pt)
}

fn check_payload_type(key: &str, pt: u8) -> Result<()> {
    if pt > MAX_PAYLOAD_TYPE {
        return Err(Error::InvalidProperty(key.to_owned(), pt.to_string()));
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidProperty(key.to_owned(), value.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtp::extension::{AUDIO_LEVEL_URI, TRANSPORT_CC_URI};

    fn properties() -> Properties {
        let mut props: Properties = [
            ("audio.opus.pt", "111"),
            ("audio.PCMU.pt", "0"),
            ("video.VP8.pt", "96"),
            ("video.vp8.rtx", "97"),
            ("video.h264.pt", "100"),
            ("video.flexfec.pt", "98"),
            ("video.speex.pt", "120"),
            ("ext.urn:example:unknown", "5"),
        ]
        .into_iter()
        .collect();
        props.set(format!("ext.{AUDIO_LEVEL_URI}"), "1");
        props.set(format!("ext.{TRANSPORT_CC_URI}"), "3");
        props
    }

    #[test]
    fn test_properties_children() {
        let props = properties();
        let video = props.children("video");
        assert_eq!(video.get("vp8.rtx"), Some("97"));
        assert_eq!(video.get("opus.pt"), None);
        assert!(props.children("data").is_empty());
    }

    #[test]
    fn test_from_properties() -> Result<()> {
        let config = TransportConfig::from_properties(&properties())?;

        assert_eq!(
            config.audio_codecs,
            vec![
                CodecMapping {
                    codec: Codec::Opus,
                    payload_type: 111,
                    rtx_payload_type: None
                },
                CodecMapping {
                    codec: Codec::Pcmu,
                    payload_type: 0,
                    rtx_payload_type: None
                },
            ]
        );
        assert_eq!(
            config.video_codecs,
            vec![
                CodecMapping {
                    codec: Codec::Vp8,
                    payload_type: 96,
                    rtx_payload_type: Some(97)
                },
                CodecMapping {
                    codec: Codec::H264,
                    payload_type: 100,
                    rtx_payload_type: None
                },
            ]
        );
        assert_eq!(config.flexfec_payload_type, Some(98));
        assert_eq!(config.extensions.len(), 2);
        assert_eq!(config.mtu, DEFAULT_MTU);

        let (rtp_map, ext_map) = config.build_maps()?;
        assert_eq!(rtp_map.codec(97), Some(Codec::Rtx));
        assert_eq!(rtp_map.associated_payload_type(97), Some(96));
        assert_eq!(rtp_map.codec(98), Some(Codec::Flexfec));
        assert_eq!(rtp_map.codec(120), None);
        assert_eq!(ext_map.kind(1), Some(ExtensionKind::AudioLevel));
        assert_eq!(ext_map.id(ExtensionKind::TransportSequenceNumber), Some(3));
        assert_eq!(ext_map.kind(5), None);
        Ok(())
    }

    #[test]
    fn test_from_properties_invalid_value() {
        let props: Properties = [("video.vp8.pt", "ninety-six")].into_iter().collect();
        assert_eq!(
            TransportConfig::from_properties(&props),
            Err(Error::InvalidProperty(
                "video.vp8.pt".to_owned(),
                "ninety-six".to_owned()
            ))
        );
    }

    #[test]
    fn test_payload_type_out_of_range() {
        for (key, value) in [
            ("video.vp8.pt", "200"),
            ("video.vp8.rtx", "128"),
            ("video.flexfec.pt", "255"),
            ("audio.opus.pt", "130"),
        ] {
            let props: Properties = [(key, value)].into_iter().collect();
            assert_eq!(
                TransportConfig::from_properties(&props),
                Err(Error::InvalidProperty(key.to_owned(), value.to_owned())),
                "{key}"
            );
        }

        let props: Properties = [("video.vp8.pt", "127")].into_iter().collect();
        assert!(TransportConfig::from_properties(&props).is_ok());

        let config = TransportConfig {
            video_codecs: vec![CodecMapping {
                codec: Codec::Vp8,
                payload_type: 96,
                rtx_payload_type: Some(200),
            }],
            ..Default::default()
        };
        assert_eq!(
            config.build_maps(),
            Err(Error::InvalidProperty("vp8".to_owned(), "200".to_owned()))
        );
    }

    #[test]
    fn test_from_json() -> Result<()> {
        let config = TransportConfig::from_json(
            r#"{
                "video_codecs": [{ "codec": "vp9", "payload_type": 98, "rtx_payload_type": 99 }],
                "extensions": { "urn:3gpp:video-orientation": 4 },
                "mtu": 1200
            }"#,
        )?;
        assert!(config.audio_codecs.is_empty());
        assert_eq!(config.video_codecs[0].codec, Codec::Vp9);
        assert_eq!(config.mtu, 1200);

        let again = TransportConfig::from_json(&config.to_json()?)?;
        assert_eq!(again, config);

        assert!(matches!(
            TransportConfig::from_json("{ \"mtu\": -1 }"),
            Err(Error::ErrConfig(_))
        ));
        Ok(())
    }
}
