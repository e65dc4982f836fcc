//! This client speaks the OpenRGB SDK protocol to switch lighting profiles.
//!
//! Only the subset needed here is implemented: protocol version negotiation,
//! client registration, device enumeration, profile listing and profile
//! loading. Every packet is a 16 byte header (magic, device id, packet id,
//! payload length, all little-endian) followed by the payload.

use anyhow::{bail, Context, Result};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tracing::debug;

static MAGIC: &[u8; 4] = b"ORGB";

/// Highest SDK protocol version this client understands.
const PROTOCOL_VERSION: u32 = 3;

const PACKET_REQUEST_CONTROLLER_COUNT: u32 = 0;
const PACKET_REQUEST_CONTROLLER_DATA: u32 = 1;
const PACKET_REQUEST_PROTOCOL_VERSION: u32 = 40;
const PACKET_SET_CLIENT_NAME: u32 = 50;
const PACKET_REQUEST_PROFILE_LIST: u32 = 150;
const PACKET_REQUEST_LOAD_PROFILE: u32 = 152;

/// A connected OpenRGB SDK client.
pub struct OpenRgbClient {
    stream: TcpStream,
    protocol_version: u32,
    profiles: Vec<String>,
}

impl OpenRgbClient {
    /// Connect to an OpenRGB server and introduce ourselves.
    pub async fn connect(host: &str, port: u16, client_name: &str) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        let mut client = Self {
            stream,
            protocol_version: 0,
            profiles: vec![],
        };
        client.negotiate_protocol_version().await?;
        client.set_client_name(client_name).await?;
        Ok(client)
    }

    /// Get the names of all connected devices.
    pub async fn device_names(&mut self) -> Result<Vec<String>> {
        self.write_packet(0, PACKET_REQUEST_CONTROLLER_COUNT, &[])
            .await?;
        let data = self.read_packet(PACKET_REQUEST_CONTROLLER_COUNT).await?;
        let count = u32::from_le_bytes(
            data.get(0..4)
                .context("controller count reply too short")?
                .try_into()?,
        );
        let mut names = Vec::with_capacity(count as usize);
        for device_id in 0..count {
            let version = self.protocol_version.to_le_bytes();
            self.write_packet(device_id, PACKET_REQUEST_CONTROLLER_DATA, &version)
                .await?;
            let data = self.read_packet(PACKET_REQUEST_CONTROLLER_DATA).await?;
            names.push(parse_controller_name(&data)?);
        }
        Ok(names)
    }

    /// Get the names of all profiles stored on the server, in server order.
    pub async fn list_profiles(&mut self) -> Result<Vec<String>> {
        self.write_packet(0, PACKET_REQUEST_PROFILE_LIST, &[])
            .await?;
        let data = self.read_packet(PACKET_REQUEST_PROFILE_LIST).await?;
        self.profiles = parse_profile_list(&data)?;
        Ok(self.profiles.clone())
    }

    /// Load the profile at `index` of the last listed profiles.
    pub async fn load_profile_by_index(&mut self, index: usize) -> Result<()> {
        let name = match self.profiles.get(index) {
            Some(name) => name.clone(),
            None => bail!("profile index {index} out of range"),
        };
        let mut payload = name.into_bytes();
        payload.push(0);
        self.write_packet(0, PACKET_REQUEST_LOAD_PROFILE, &payload)
            .await
    }

    async fn negotiate_protocol_version(&mut self) -> Result<()> {
        let version = PROTOCOL_VERSION.to_le_bytes();
        self.write_packet(0, PACKET_REQUEST_PROTOCOL_VERSION, &version)
            .await?;
        let data = self.read_packet(PACKET_REQUEST_PROTOCOL_VERSION).await?;
        let server_version = u32::from_le_bytes(
            data.get(0..4)
                .context("protocol version reply too short")?
                .try_into()?,
        );
        self.protocol_version = PROTOCOL_VERSION.min(server_version);
        debug!(version = self.protocol_version, "negotiated protocol version");
        Ok(())
    }

    async fn set_client_name(&mut self, client_name: &str) -> Result<()> {
        let mut payload = client_name.as_bytes().to_vec();
        payload.push(0);
        self.write_packet(0, PACKET_SET_CLIENT_NAME, &payload).await
    }

    async fn write_packet(&mut self, device_id: u32, packet_id: u32, data: &[u8]) -> Result<()> {
        let mut packet = Vec::with_capacity(16 + data.len());
        packet.extend_from_slice(MAGIC);
        packet.extend_from_slice(&device_id.to_le_bytes());
        packet.extend_from_slice(&packet_id.to_le_bytes());
        packet.extend_from_slice(&(data.len() as u32).to_le_bytes());
        packet.extend_from_slice(data);
        self.stream.write_all(&packet).await?;
        Ok(())
    }

    async fn read_packet(&mut self, expected_packet_id: u32) -> Result<Vec<u8>> {
        let mut header = [0u8; 16];
        self.stream.read_exact(&mut header).await?;
        if &header[0..4] != MAGIC {
            bail!("reply does not start with the OpenRGB magic");
        }
        let packet_id = u32::from_le_bytes(header[8..12].try_into()?);
        if packet_id != expected_packet_id {
            bail!("expected packet {expected_packet_id}, got {packet_id}");
        }
        let size = u32::from_le_bytes(header[12..16].try_into()?) as usize;
        let mut data = vec![0u8; size];
        self.stream.read_exact(&mut data).await?;
        Ok(data)
    }
}

/// Pick the first server profile containing the configured name.
pub fn find_profile_index(profiles: &[String], configured_name: &str) -> Option<usize> {
    profiles
        .iter()
        .position(|profile| profile.contains(configured_name))
}

/// Extract the device name from a controller data reply.
///
/// The name follows the total size (`u32`) and device type (`i32`); the
/// zone, mode and LED data behind it is not needed and left unparsed.
fn parse_controller_name(data: &[u8]) -> Result<String> {
    let (name, _) = read_string(data.get(8..).context("controller data too short")?)?;
    Ok(name)
}

/// Read a length-prefixed, NUL-terminated string.
fn read_string(data: &[u8]) -> Result<(String, &[u8])> {
    let length = u16::from_le_bytes(
        data.get(0..2)
            .context("string length missing")?
            .try_into()?,
    ) as usize;
    let raw = data
        .get(2..2 + length)
        .context("string length exceeds packet")?;
    let name = String::from_utf8_lossy(raw.strip_suffix(&[0]).unwrap_or(raw)).into_owned();
    Ok((name, &data[2 + length..]))
}

/// Parse a profile list reply into profile names.
fn parse_profile_list(data: &[u8]) -> Result<Vec<String>> {
    let count = u16::from_le_bytes(
        data.get(4..6)
            .context("profile list reply too short")?
            .try_into()?,
    ) as usize;
    let mut rest = data.get(6..).context("profile list reply too short")?;
    let mut profiles = Vec::with_capacity(count);
    for _ in 0..count {
        let (name, remaining) = read_string(rest)?;
        profiles.push(name);
        rest = remaining;
    }
    Ok(profiles)
}
