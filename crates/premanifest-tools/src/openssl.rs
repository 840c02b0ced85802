use crate::runner::{Invocation, ToolRunner};
use crate::ToolError;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq)]
pub enum RsaTextError {
    #[error("bad {field} hex: {source}")]
    Hex {
        field: &'static str,
        source: hex::FromHexError,
    },
    #[error("no {0} found")]
    Missing(&'static str),
}

/// RSA public key components as big-endian bytes, leading zero bytes removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    pub bits: Option<u32>,
    pub modulus: Vec<u8>,
    pub exponent: Vec<u8>,
}

impl RsaPublicKey {
    pub fn modulus_hex(&self) -> String {
        hex::encode(&self.modulus)
    }

    pub fn exponent_hex(&self) -> String {
        hex::encode(&self.exponent)
    }
}

struct Patterns {
    modulus_line: Regex,
    exponent: Regex,
    bits: Regex,
}

fn patterns() -> &'static Patterns {
    static P: OnceLock<Patterns> = OnceLock::new();
    P.get_or_init(|| Patterns {
        modulus_line: Regex::new(r"^\s+([0-9a-f]{2}(?::[0-9a-f]{2})*):?\s*$")
            .expect("valid modulus pattern"),
        exponent: Regex::new(r"Exponent: \d+ \(0x([0-9a-f]+)\)").expect("valid exponent pattern"),
        bits: Regex::new(r"Public-Key: \((\d+) bit\)").expect("valid bits pattern"),
    })
}

fn strip_leading_zeros(bytes: &mut Vec<u8>) {
    let zeros = bytes.iter().take_while(|b| **b == 0).count();
    bytes.drain(..zeros);
}

fn decode_component(field: &'static str, digits: &str) -> Result<Vec<u8>, RsaTextError> {
    let mut bytes = hex::decode(digits).map_err(|source| RsaTextError::Hex { field, source })?;
    strip_leading_zeros(&mut bytes);
    if bytes.is_empty() {
        return Err(RsaTextError::Missing(field));
    }
    Ok(bytes)
}

/// Parse the text form printed by `openssl rsa -pubin -text -noout`.
pub fn parse_rsa_text(text: &str) -> Result<RsaPublicKey, RsaTextError> {
    let p = patterns();
    let mut modulus_hex = String::new();
    let mut exponent_hex = String::new();
    let mut bits = None;

    for line in text.lines() {
        if let Some(caps) = p.modulus_line.captures(line) {
            modulus_hex.extend(caps[1].split(':'));
        } else if let Some(caps) = p.exponent.captures(line) {
            let digits = &caps[1];
            if digits.len() % 2 == 1 {
                exponent_hex.push('0');
            }
            exponent_hex.push_str(digits);
        } else if let Some(caps) = p.bits.captures(line) {
            bits = caps[1].parse::<u32>().ok();
        }
    }

    let modulus = decode_component("modulus", &modulus_hex)?;
    let exponent = decode_component("exponent", &exponent_hex)?;

    Ok(RsaPublicKey {
        bits,
        modulus,
        exponent,
    })
}

pub fn dump_rsa_public_key(
    runner: &dyn ToolRunner,
    openssl: &str,
    pem: &Path,
) -> Result<RsaPublicKey, ToolError> {
    let invocation = Invocation::new(openssl)
        .arg("rsa")
        .arg("-inform")
        .arg("PEM")
        .arg("-pubin")
        .arg("-in")
        .arg_path(pem)
        .arg("-text")
        .arg("-noout");
    let stdout = runner.run(&invocation)?;
    let key = parse_rsa_text(&String::from_utf8_lossy(&stdout)).map_err(|e| {
        ToolError::InvalidOutput {
            command: invocation.to_string(),
            reason: e.to_string(),
        }
    })?;

    if let Some(bits) = key.bits {
        if key.modulus.len() != bits.div_ceil(8) as usize {
            warn!(
                "{}: declared {bits}-bit key but modulus is {} bytes",
                pem.display(),
                key.modulus.len()
            );
        }
    }
    Ok(key)
}

/// Convert a PEM certificate to DER bytes.
pub fn cert_pem_to_der(
    runner: &dyn ToolRunner,
    openssl: &str,
    pem: &Path,
) -> Result<Vec<u8>, ToolError> {
    let invocation = Invocation::new(openssl)
        .arg("x509")
        .arg("-outform")
        .arg("der")
        .arg("-in")
        .arg_path(pem);
    runner.run(&invocation)
}
