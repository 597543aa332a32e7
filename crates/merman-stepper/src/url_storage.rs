#![forbid(unsafe_code)]

//! Diagram state carried in a page URL.
//!
//! The diagram text lives in the fragment as zlib-compressed, standard-base64 text; auxiliary
//! values (such as the current step) live in the query string.

use crate::error::UrlError;
use base64::Engine as _;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use percent_encoding::percent_decode_str;
use std::io::{Read, Write};
use tracing::info;
use url::Url;

pub fn compress(text: &str) -> Result<String, UrlError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(text.as_bytes())
        .map_err(UrlError::Deflate)?;
    let bytes = encoder.finish().map_err(UrlError::Deflate)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

pub fn decompress(value: &str) -> Result<String, UrlError> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(value)?;
    let mut out = Vec::new();
    ZlibDecoder::new(bytes.as_slice())
        .read_to_end(&mut out)
        .map_err(UrlError::Inflate)?;
    Ok(String::from_utf8(out)?)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlStorage {
    url: Url,
}

impl UrlStorage {
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        Ok(Self {
            url: Url::parse(input)?,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn into_url(self) -> Url {
        self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Diagram text stored in the fragment, if any.
    ///
    /// Fragments that are not compressed payloads are read as percent-encoded plain text.
    pub fn text(&self) -> Option<String> {
        let fragment = self.url.fragment().filter(|f| !f.is_empty())?;
        match decompress(fragment) {
            Ok(text) => Some(text),
            Err(err) => {
                info!(error = %err, "url fragment is not compressed; reading it as plain text");
                Some(percent_decode_str(fragment).decode_utf8_lossy().into_owned())
            }
        }
    }

    pub fn set_text(&mut self, text: &str) -> Result<(), UrlError> {
        let payload = compress(text)?;
        self.url.set_fragment(Some(&payload));
        Ok(())
    }

    /// First value of query parameter `key`; empty values read as absent.
    pub fn get(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
    }

    /// Sets query parameter `key`, keeping the position of its first occurrence and dropping any
    /// later duplicates.
    pub fn set(&mut self, key: &str, value: &str) {
        let mut pairs: Vec<(String, String)> = Vec::new();
        let mut replaced = false;
        for (k, v) in self.url.query_pairs() {
            if k == key {
                if !replaced {
                    pairs.push((k.into_owned(), value.to_string()));
                    replaced = true;
                }
                continue;
            }
            pairs.push((k.into_owned(), v.into_owned()));
        }
        if !replaced {
            pairs.push((key.to_string(), value.to_string()));
        }
        self.url.query_pairs_mut().clear().extend_pairs(pairs);
    }
}

impl From<Url> for UrlStorage {
    fn from(url: Url) -> Self {
        Self { url }
    }
}
