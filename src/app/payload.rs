//! Report encoding.
//!
//! The collector expects an HTTP/1.0 POST with a compact JSON body in which
//! every number is sent as a string:
//!
//! ```text
//! {"sensors":{"28:1c:f0:1e:00:00:80:3f":{"value":"215000","status":"success"},...},
//!  "millivolt":"3012","rssi":"-67"}
//! ```
//!
//! Sensors appear in table order.

use core::fmt::Display;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::config::NodeConfig;
use crate::sensors::{Sample, SensorAddress};

fn as_text<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

#[derive(Serialize)]
struct Reading {
    #[serde(serialize_with = "as_text")]
    value: i32,
    status: &'static str,
}

struct SensorMap<'a> {
    addresses: &'a [SensorAddress],
    samples: &'a [Sample],
}

impl Serialize for SensorMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.addresses.len().min(self.samples.len());
        let mut map = serializer.serialize_map(Some(len))?;
        for (address, sample) in self.addresses.iter().zip(self.samples) {
            let reading = Reading {
                value: sample.temperature,
                status: sample.status.as_str(),
            };
            map.serialize_entry(&address.to_string(), &reading)?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct Report<'a> {
    sensors: SensorMap<'a>,
    #[serde(serialize_with = "as_text")]
    millivolt: u32,
    #[serde(serialize_with = "as_text")]
    rssi: i8,
}

/// Encode the JSON body. A missing RSSI is reported as 0.
pub fn build_body(
    addresses: &[SensorAddress],
    samples: &[Sample],
    millivolts: u32,
    rssi: Option<i8>,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Report {
        sensors: SensorMap { addresses, samples },
        millivolt: millivolts,
        rssi: rssi.unwrap_or(0),
    })
}

/// Wrap `body` in an HTTP/1.0 POST request.
pub fn http_post(config: &NodeConfig, body: &str) -> Vec<u8> {
    let mut request = format!(
        "POST {} HTTP/1.0\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
        config.http_path,
        config.http_host,
        body.len()
    )
    .into_bytes();
    request.extend_from_slice(body.as_bytes());
    request
}

/// Body plus HTTP framing, ready for the transport.
pub fn build_request(
    config: &NodeConfig,
    addresses: &[SensorAddress],
    samples: &[Sample],
    millivolts: u32,
    rssi: Option<i8>,
) -> Result<Vec<u8>, serde_json::Error> {
    let body = build_body(addresses, samples, millivolts, rssi)?;
    Ok(http_post(config, &body))
}
