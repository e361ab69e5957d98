//! MAC-command payloads, the identifier catalogue and the byte-stream
//! codec used for FOpts and port-0 FRMPayloads.
//!
//! The set of standard commands is a compile-time catalogue: payload sizes
//! and constructors are resolved from (direction, CID) without any lookup
//! table at runtime. Proprietary commands (CID 0x80..=0xFF) extend the
//! catalogue through a process-wide registry behind a read/write lock.

use std::collections::HashMap;
use std::sync::{LazyLock, PoisonError, RwLock};

use crate::types::{ChMask, DLSettings, Frequency};
use crate::{Direction, Error};

macro_rules! mac_cmd_zero_len {
    (
        $(
            $(#[$outer:meta])*
            struct $type:ident[cid=$cid:expr, uplink=$uplink:expr]
        )*
    ) => {
        $(
            $(#[$outer])*
            #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
            pub struct $type();

            impl $type {
                /// Creation.
                pub fn new() -> $type {
                    $type()
                }

                /// Decodes the (empty) payload, verifying that no bytes
                /// were supplied.
                pub fn from_bytes(data: &[u8]) -> Result<$type, Error> {
                    if !data.is_empty() {
                        return Err(Error::InvalidLength {
                            field: stringify!($type),
                            expected: 0,
                            got: data.len(),
                        });
                    }
                    Ok($type())
                }

                /// Get the CID.
                pub const fn cid() -> u8 {
                    $cid
                }

                /// Sent by end device or sent by network server.
                pub const fn uplink() -> bool {
                    $uplink
                }

                /// Length of the empty payload.
                pub const fn len() -> usize {
                    0
                }

                /// Reference to the empty payload.
                pub fn bytes(&self) -> &[u8] {
                    &[]
                }
            }
        )*
    }
}

macro_rules! mac_cmds {
    (
        $(
            $(#[$outer:meta])*
            struct $type:ident[cid=$cid:expr, uplink=$uplink:expr, size=$size:expr]
        )*
    ) => {
        $(
            $(#[$outer])*
            #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
            pub struct $type(pub(crate) [u8; $size]);

            impl $type {
                /// Decodes the payload from its wire bytes.
                pub fn from_bytes(data: &[u8]) -> Result<$type, Error> {
                    if data.len() != $size {
                        return Err(Error::InvalidLength {
                            field: stringify!($type),
                            expected: $size,
                            got: data.len(),
                        });
                    }
                    let mut payload = [0u8; $size];
                    payload.copy_from_slice(data);
                    Ok($type(payload))
                }

                /// Get the CID.
                pub const fn cid() -> u8 {
                    $cid
                }

                /// Sent by end device or sent by network server.
                pub const fn uplink() -> bool {
                    $uplink
                }

                /// Length of payload without the CID.
                pub const fn len() -> usize {
                    $size
                }

                /// Reference to the payload.
                pub fn bytes(&self) -> &[u8] {
                    &self.0
                }
            }

            impl From<[u8; $size]> for $type {
                fn from(v: [u8; $size]) -> Self {
                    $type(v)
                }
            }
        )*
    }
}

macro_rules! create_ack_fn {
    (
        $(#[$outer:meta])*
        $fn_name:ident, $offset:expr
    ) => (
        $(#[$outer])*
        pub fn $fn_name(&self) -> bool {
            self.0[0] & (0x01 << $offset) != 0
        }
    )
}

macro_rules! create_value_reader_fn {
    (
        $(#[$outer:meta])*
        $fn_name:ident, $index:expr
    ) => (
        $(#[$outer])*
        pub fn $fn_name(&self) -> u8 {
            self.0[$index]
        }
    )
}

mac_cmd_zero_len! {
    /// LinkCheckReqPayload represents the LinkCheckReq LoRaWAN MACCommand.
    struct LinkCheckReqPayload[cid=0x02, uplink=true]

    /// DutyCycleAnsPayload represents the DutyCycleAns LoRaWAN MACCommand.
    struct DutyCycleAnsPayload[cid=0x04, uplink=true]

    /// DevStatusReqPayload represents the DevStatusReq LoRaWAN MACCommand.
    struct DevStatusReqPayload[cid=0x06, uplink=false]

    /// RXTimingSetupAnsPayload represents the RXTimingSetupAns LoRaWAN MACCommand.
    struct RXTimingSetupAnsPayload[cid=0x08, uplink=true]

    /// TXParamSetupAnsPayload represents the TXParamSetupAns LoRaWAN MACCommand.
    struct TXParamSetupAnsPayload[cid=0x09, uplink=true]

    /// ADRParamSetupAnsPayload represents the ADRParamSetupAns LoRaWAN MACCommand.
    struct ADRParamSetupAnsPayload[cid=0x0C, uplink=true]

    /// DeviceTimeReqPayload represents the DeviceTimeReq LoRaWAN MACCommand.
    struct DeviceTimeReqPayload[cid=0x0D, uplink=true]

    /// PingSlotInfoAnsPayload represents the PingSlotInfoAns LoRaWAN MACCommand.
    struct PingSlotInfoAnsPayload[cid=0x10, uplink=false]
}

mac_cmds! {
    /// ResetIndPayload represents the ResetInd LoRaWAN MACCommand.
    struct ResetIndPayload[cid=0x01, uplink=true, size=1]

    /// ResetConfPayload represents the ResetConf LoRaWAN MACCommand.
    struct ResetConfPayload[cid=0x01, uplink=false, size=1]

    /// LinkCheckAnsPayload represents the LinkCheckAns LoRaWAN MACCommand.
    struct LinkCheckAnsPayload[cid=0x02, uplink=false, size=2]

    /// LinkADRReqPayload represents the LinkADRReq LoRaWAN MACCommand.
    struct LinkADRReqPayload[cid=0x03, uplink=false, size=4]

    /// LinkADRAnsPayload represents the LinkADRAns LoRaWAN MACCommand.
    struct LinkADRAnsPayload[cid=0x03, uplink=true, size=1]

    /// DutyCycleReqPayload represents the DutyCycleReq LoRaWAN MACCommand.
    struct DutyCycleReqPayload[cid=0x04, uplink=false, size=1]

    /// RXParamSetupReqPayload represents the RXParamSetupReq LoRaWAN MACCommand.
    struct RXParamSetupReqPayload[cid=0x05, uplink=false, size=4]

    /// RXParamSetupAnsPayload represents the RXParamSetupAns LoRaWAN MACCommand.
    struct RXParamSetupAnsPayload[cid=0x05, uplink=true, size=1]

    /// DevStatusAnsPayload represents the DevStatusAns LoRaWAN MACCommand.
    struct DevStatusAnsPayload[cid=0x06, uplink=true, size=2]

    /// NewChannelReqPayload represents the NewChannelReq LoRaWAN MACCommand.
    struct NewChannelReqPayload[cid=0x07, uplink=false, size=5]

    /// NewChannelAnsPayload represents the NewChannelAns LoRaWAN MACCommand.
    struct NewChannelAnsPayload[cid=0x07, uplink=true, size=1]

    /// RXTimingSetupReqPayload represents the RXTimingSetupReq LoRaWAN MACCommand.
    struct RXTimingSetupReqPayload[cid=0x08, uplink=false, size=1]

    /// TXParamSetupReqPayload represents the TXParamSetupReq LoRaWAN MACCommand.
    struct TXParamSetupReqPayload[cid=0x09, uplink=false, size=1]

    /// DlChannelReqPayload represents the DlChannelReq LoRaWAN MACCommand.
    struct DlChannelReqPayload[cid=0x0A, uplink=false, size=4]

    /// DlChannelAnsPayload represents the DlChannelAns LoRaWAN MACCommand.
    struct DlChannelAnsPayload[cid=0x0A, uplink=true, size=1]

    /// RekeyIndPayload represents the RekeyInd LoRaWAN MACCommand.
    struct RekeyIndPayload[cid=0x0B, uplink=true, size=1]

    /// RekeyConfPayload represents the RekeyConf LoRaWAN MACCommand.
    struct RekeyConfPayload[cid=0x0B, uplink=false, size=1]

    /// ADRParamSetupReqPayload represents the ADRParamSetupReq LoRaWAN MACCommand.
    struct ADRParamSetupReqPayload[cid=0x0C, uplink=false, size=1]

    /// DeviceTimeAnsPayload represents the DeviceTimeAns LoRaWAN MACCommand.
    struct DeviceTimeAnsPayload[cid=0x0D, uplink=false, size=5]

    /// ForceRejoinReqPayload represents the ForceRejoinReq LoRaWAN MACCommand.
    struct ForceRejoinReqPayload[cid=0x0E, uplink=false, size=2]

    /// RejoinParamSetupReqPayload represents the RejoinParamSetupReq LoRaWAN MACCommand.
    struct RejoinParamSetupReqPayload[cid=0x0F, uplink=false, size=1]

    /// RejoinParamSetupAnsPayload represents the RejoinParamSetupAns LoRaWAN MACCommand.
    struct RejoinParamSetupAnsPayload[cid=0x0F, uplink=true, size=1]

    /// PingSlotInfoReqPayload represents the PingSlotInfoReq LoRaWAN MACCommand.
    struct PingSlotInfoReqPayload[cid=0x10, uplink=true, size=1]

    /// PingSlotChannelReqPayload represents the PingSlotChannelReq LoRaWAN MACCommand.
    struct PingSlotChannelReqPayload[cid=0x11, uplink=false, size=4]

    /// PingSlotChannelAnsPayload represents the PingSlotChannelAns LoRaWAN MACCommand.
    struct PingSlotChannelAnsPayload[cid=0x11, uplink=true, size=1]

    /// BeaconFreqReqPayload represents the BeaconFreqReq LoRaWAN MACCommand.
    struct BeaconFreqReqPayload[cid=0x13, uplink=false, size=3]

    /// BeaconFreqAnsPayload represents the BeaconFreqAns LoRaWAN MACCommand.
    struct BeaconFreqAnsPayload[cid=0x13, uplink=true, size=1]
}

/// A proprietary MAC command: an opaque payload under a registered CID in
/// 0x80..=0xFF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProprietaryPayload {
    pub cid: u8,
    pub payload: Vec<u8>,
}

macro_rules! mac_cmds_enum {
    (
        pub enum $outer:ident {
            $(
                $name:ident($type:ident),
            )*
        }
    ) => {
        /// A single MAC command: its identifier together with its typed
        /// payload. The same CID resolves to different commands depending
        /// on the direction of the carrying frame.
        #[derive(Debug, Clone, PartialEq, Eq)]
        #[allow(clippy::len_without_is_empty)]
        pub enum $outer {
            $(
                $name($type),
            )*
            Proprietary(ProprietaryPayload),
        }

        impl $outer {
            /// The command identifier.
            pub fn cid(&self) -> u8 {
                match *self {
                    $(
                        Self::$name(_) => $type::cid(),
                    )*
                    Self::Proprietary(ref v) => v.cid,
                }
            }

            /// Length of the payload, CID excluded.
            pub fn len(&self) -> usize {
                match *self {
                    $(
                        Self::$name(_) => $type::len(),
                    )*
                    Self::Proprietary(ref v) => v.payload.len(),
                }
            }

            /// The raw payload bytes, CID excluded.
            pub fn payload_bytes(&self) -> &[u8] {
                match *self {
                    $(
                        Self::$name(ref v) => v.bytes(),
                    )*
                    Self::Proprietary(ref v) => &v.payload,
                }
            }
        }

        fn known_payload_size(uplink: bool, cid: u8) -> Option<usize> {
            match (uplink, cid) {
                $(
                    (u, c) if u == $type::uplink() && c == $type::cid() => Some($type::len()),
                )*
                _ => None,
            }
        }

        fn decode_known(uplink: bool, cid: u8, payload: &[u8]) -> Option<Result<$outer, Error>> {
            $(
                if uplink == $type::uplink() && cid == $type::cid() {
                    return Some($type::from_bytes(payload).map($outer::$name));
                }
            )*
            None
        }
    }
}

mac_cmds_enum! {
    pub enum MacCommand {
        ResetInd(ResetIndPayload),
        ResetConf(ResetConfPayload),
        LinkCheckReq(LinkCheckReqPayload),
        LinkCheckAns(LinkCheckAnsPayload),
        LinkADRReq(LinkADRReqPayload),
        LinkADRAns(LinkADRAnsPayload),
        DutyCycleReq(DutyCycleReqPayload),
        DutyCycleAns(DutyCycleAnsPayload),
        RXParamSetupReq(RXParamSetupReqPayload),
        RXParamSetupAns(RXParamSetupAnsPayload),
        DevStatusReq(DevStatusReqPayload),
        DevStatusAns(DevStatusAnsPayload),
        NewChannelReq(NewChannelReqPayload),
        NewChannelAns(NewChannelAnsPayload),
        RXTimingSetupReq(RXTimingSetupReqPayload),
        RXTimingSetupAns(RXTimingSetupAnsPayload),
        TXParamSetupReq(TXParamSetupReqPayload),
        TXParamSetupAns(TXParamSetupAnsPayload),
        DlChannelReq(DlChannelReqPayload),
        DlChannelAns(DlChannelAnsPayload),
        RekeyInd(RekeyIndPayload),
        RekeyConf(RekeyConfPayload),
        ADRParamSetupReq(ADRParamSetupReqPayload),
        ADRParamSetupAns(ADRParamSetupAnsPayload),
        DeviceTimeReq(DeviceTimeReqPayload),
        DeviceTimeAns(DeviceTimeAnsPayload),
        ForceRejoinReq(ForceRejoinReqPayload),
        RejoinParamSetupReq(RejoinParamSetupReqPayload),
        RejoinParamSetupAns(RejoinParamSetupAnsPayload),
        PingSlotInfoReq(PingSlotInfoReqPayload),
        PingSlotInfoAns(PingSlotInfoAnsPayload),
        PingSlotChannelReq(PingSlotChannelReqPayload),
        PingSlotChannelAns(PingSlotChannelAnsPayload),
        BeaconFreqReq(BeaconFreqReqPayload),
        BeaconFreqAns(BeaconFreqAnsPayload),
    }
}

/// Calculates the length in bytes of a sequence of MAC commands, CIDs
/// included.
pub fn mac_commands_len(cmds: &[MacCommand]) -> usize {
    cmds.iter().map(|mc| mc.len() + 1).sum()
}

pub(crate) fn serialize_mac_commands(cmds: &[MacCommand], out: &mut Vec<u8>) {
    for cmd in cmds {
        out.push(cmd.cid());
        out.extend_from_slice(cmd.payload_bytes());
    }
}

static PROPRIETARY_REGISTRY: LazyLock<RwLock<HashMap<(Direction, u8), usize>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Registers a proprietary MAC command so the stream decoder can carry it
/// as an opaque [`ProprietaryPayload`] of `payload_len` bytes.
///
/// Registration is process-wide. Registering the same (direction, CID)
/// pair again replaces the previous payload length.
pub fn register_proprietary_mac_command(
    direction: Direction,
    cid: u8,
    payload_len: usize,
) -> Result<(), Error> {
    if cid < 0x80 {
        return Err(Error::InvalidProprietaryCid { cid });
    }
    let mut registry = PROPRIETARY_REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    registry.insert((direction, cid), payload_len);
    Ok(())
}

fn proprietary_payload_size(direction: Direction, cid: u8) -> Option<usize> {
    if cid < 0x80 {
        return None;
    }
    let registry = PROPRIETARY_REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    registry.get(&(direction, cid)).copied()
}

/// Resolves the payload size of a command identifier for the given
/// direction, consulting the proprietary registry for CIDs at or above
/// 0x80. `None` means the identifier is unknown.
pub fn payload_size(direction: Direction, cid: u8) -> Option<usize> {
    known_payload_size(direction.is_uplink(), cid)
        .or_else(|| proprietary_payload_size(direction, cid))
}

/// Iterator over the MAC commands packed into a byte buffer (FOpts, or a
/// port-0 FRMPayload after decryption).
///
/// An unknown CID terminates the iteration: the bytes from that position
/// on are not commands this process can interpret, so they are left to the
/// caller and a debug line is logged. A *known* CID whose announced
/// payload does not fit the remaining bytes yields a final `Err`, after
/// the commands already decoded.
pub struct MacCommandIterator<'a> {
    data: &'a [u8],
    index: usize,
    direction: Direction,
}

impl<'a> MacCommandIterator<'a> {
    /// Creation.
    pub fn new(data: &'a [u8], direction: Direction) -> Self {
        Self { data, index: 0, direction }
    }
}

impl Iterator for MacCommandIterator<'_> {
    type Item = Result<MacCommand, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.data.len() {
            return None;
        }
        let cid = self.data[self.index];
        let size = match payload_size(self.direction, cid) {
            Some(s) => s,
            None => {
                tracing::debug!(cid, "unknown MAC command terminates the stream");
                self.index = self.data.len();
                return None;
            }
        };
        let remaining = &self.data[self.index..];
        if remaining.len() < 1 + size {
            self.index = self.data.len();
            return Some(Err(Error::NotEnoughBytes));
        }
        let payload = &remaining[1..1 + size];
        self.index += 1 + size;
        match decode_known(self.direction.is_uplink(), cid, payload) {
            Some(res) => Some(res),
            None => Some(Ok(MacCommand::Proprietary(ProprietaryPayload {
                cid,
                payload: payload.to_vec(),
            }))),
        }
    }
}

/// Parses a byte buffer into MAC commands for the given direction.
///
/// See [`MacCommandIterator`] for the unknown-CID and truncation
/// behaviour; use the iterator directly to keep the commands decoded
/// before a truncation error.
pub fn parse_mac_commands(data: &[u8], direction: Direction) -> Result<Vec<MacCommand>, Error> {
    MacCommandIterator::new(data, direction).collect()
}

impl ResetIndPayload {
    /// Creates a ResetInd for the given LoRaWAN minor version.
    pub fn new(minor: u8) -> Result<Self, Error> {
        if minor > 0x0f {
            return Err(Error::InvalidFieldValue("minor version must be in 0..=15"));
        }
        Ok(ResetIndPayload([minor]))
    }

    /// The LoRaWAN minor version of the device.
    pub fn minor(&self) -> u8 {
        self.0[0] & 0x0f
    }
}

impl ResetConfPayload {
    /// Creates a ResetConf for the given LoRaWAN minor version.
    pub fn new(minor: u8) -> Result<Self, Error> {
        if minor > 0x0f {
            return Err(Error::InvalidFieldValue("minor version must be in 0..=15"));
        }
        Ok(ResetConfPayload([minor]))
    }

    /// The LoRaWAN minor version the network commits to.
    pub fn minor(&self) -> u8 {
        self.0[0] & 0x0f
    }
}

impl LinkCheckAnsPayload {
    /// Creates a LinkCheckAns from the demodulation margin and the gateway
    /// count.
    pub fn new(margin: u8, gateway_count: u8) -> Self {
        LinkCheckAnsPayload([margin, gateway_count])
    }

    create_value_reader_fn!(
        /// The link margin in dB of the last successfully received
        /// LinkCheckReq command.
        margin,
        0
    );

    create_value_reader_fn!(
        /// The number of gateways that successfully received the last
        /// LinkCheckReq command.
        gateway_count,
        1
    );
}

/// Redundancy represents the LinkADRReq Redundancy from LoRaWAN.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Redundancy(u8);

impl Redundancy {
    /// Packs the channel-mask control and the transmission count.
    pub fn new(ch_mask_cntl: u8, nb_rep: u8) -> Result<Self, Error> {
        if ch_mask_cntl > 0x07 {
            return Err(Error::InvalidFieldValue("ch_mask_cntl must be in 0..=7"));
        }
        if nb_rep > 0x0f {
            return Err(Error::InvalidFieldValue("nb_rep must be in 0..=15"));
        }
        Ok(Redundancy(ch_mask_cntl << 4 | nb_rep))
    }

    /// Controls the interpretation of the previously defined ChannelMask
    /// bit mask.
    pub fn channel_mask_control(&self) -> u8 {
        (self.0 >> 4) & 0x07
    }

    /// How many times each message should be repeated.
    pub fn number_of_transmissions(&self) -> u8 {
        self.0 & 0x0f
    }

    /// The integer value of the Redundancy.
    pub fn raw_value(&self) -> u8 {
        self.0
    }
}

impl From<u8> for Redundancy {
    fn from(v: u8) -> Self {
        Redundancy(v)
    }
}

impl LinkADRReqPayload {
    /// Creates a LinkADRReq. Data rate and TX power are indices in
    /// 0..=15.
    pub fn new(
        data_rate: u8,
        tx_power: u8,
        ch_mask: ChMask,
        redundancy: Redundancy,
    ) -> Result<Self, Error> {
        if data_rate > 0x0f {
            return Err(Error::InvalidFieldValue("data_rate must be in 0..=15"));
        }
        if tx_power > 0x0f {
            return Err(Error::InvalidFieldValue("tx_power must be in 0..=15"));
        }
        let mask = ch_mask.to_bytes();
        Ok(LinkADRReqPayload([data_rate << 4 | tx_power, mask[0], mask[1], redundancy.raw_value()]))
    }

    /// Data Rate that the device should use for its next transmissions.
    pub fn data_rate(&self) -> u8 {
        self.0[0] >> 4
    }

    /// TX Power that the device should use for its next transmissions.
    pub fn tx_power(&self) -> u8 {
        self.0[0] & 0x0f
    }

    /// Usable channels for next transmissions.
    pub fn ch_mask(&self) -> ChMask {
        ChMask::new_from_raw(&self.0[1..3])
    }

    /// Provides information how channel mask is to be interpreted and how
    /// many times each message should be repeated.
    pub fn redundancy(&self) -> Redundancy {
        Redundancy::from(self.0[3])
    }
}

impl LinkADRAnsPayload {
    /// Creates a LinkADRAns from the three acknowledgement bits.
    pub fn new(channel_mask_ack: bool, data_rate_ack: bool, power_ack: bool) -> Self {
        LinkADRAnsPayload([
            u8::from(channel_mask_ack) | u8::from(data_rate_ack) << 1 | u8::from(power_ack) << 2,
        ])
    }

    create_ack_fn!(
        /// Whether the channel mask change was applied successfully.
        channel_mask_ack,
        0
    );

    create_ack_fn!(
        /// Whether the data rate change was applied successfully.
        data_rate_ack,
        1
    );

    create_ack_fn!(
        /// Whether the power change was applied successfully.
        power_ack,
        2
    );

    /// Whether the device has accepted the new parameters or not.
    pub fn ack(&self) -> bool {
        self.0[0] == 0x07
    }
}

impl DutyCycleReqPayload {
    /// Creates a DutyCycleReq from the MaxDCycle exponent.
    pub fn new(max_duty_cycle: u8) -> Result<Self, Error> {
        if max_duty_cycle > 0x0f {
            return Err(Error::InvalidFieldValue("max_duty_cycle must be in 0..=15"));
        }
        Ok(DutyCycleReqPayload([max_duty_cycle]))
    }

    /// Integer value of the max duty cycle field.
    pub fn max_duty_cycle_raw(&self) -> u8 {
        self.0[0] & 0x0f
    }

    /// Value of the max duty cycle field as portion of time (ex: 0.5).
    pub fn max_duty_cycle(&self) -> f32 {
        let divisor = 1 << self.max_duty_cycle_raw();
        1.0 / (divisor as f32)
    }
}

impl RXParamSetupReqPayload {
    /// Creates a RXParamSetupReq carrying the downlink settings and the
    /// RX2 frequency.
    pub fn new(dl_settings: DLSettings, frequency: Frequency) -> Self {
        let f = frequency.to_bytes();
        RXParamSetupReqPayload([dl_settings.raw_value(), f[0], f[1], f[2]])
    }

    /// Downlink settings - namely rx1_dr_offset and rx2_data_rate.
    pub fn dl_settings(&self) -> DLSettings {
        DLSettings::from(self.0[0])
    }

    /// RX2 frequency.
    pub fn frequency(&self) -> Frequency {
        Frequency::new_from_raw(&self.0[1..])
    }
}

impl RXParamSetupAnsPayload {
    /// Creates a RXParamSetupAns from the three acknowledgement bits.
    pub fn new(channel_ack: bool, rx2_data_rate_ack: bool, rx1_dr_offset_ack: bool) -> Self {
        RXParamSetupAnsPayload([
            u8::from(channel_ack)
                | u8::from(rx2_data_rate_ack) << 1
                | u8::from(rx1_dr_offset_ack) << 2,
        ])
    }

    create_ack_fn!(
        /// Whether the channel change was applied successfully.
        channel_ack,
        0
    );

    create_ack_fn!(
        /// Whether the rx2 data rate change was applied successfully.
        rx2_data_rate_ack,
        1
    );

    create_ack_fn!(
        /// Whether the rx1 data rate offset change was applied
        /// successfully.
        rx1_dr_offset_ack,
        2
    );

    /// Whether the device has accepted the new parameters or not.
    pub fn ack(&self) -> bool {
        self.0[0] == 0x07
    }
}

impl DevStatusAnsPayload {
    /// Creates a DevStatusAns. The margin is the demodulation
    /// signal-to-noise ratio, valid in -32..=31.
    pub fn new(battery: u8, margin: i8) -> Result<Self, Error> {
        if !(-32..=31).contains(&margin) {
            return Err(Error::InvalidFieldValue("margin must be in -32..=31"));
        }
        Ok(DevStatusAnsPayload([battery, (margin as u8) & 0x3f]))
    }

    create_value_reader_fn!(
        /// The battery level of the device.
        ///
        /// Note: 0 means that the device is powered by an external source,
        /// 255 means that the device was unable to measure its battery
        /// level, any other value represents the actual battery level.
        battery,
        0
    );

    /// The margin is the demodulation signal-to-noise ratio in dB rounded
    /// to the nearest integer value for the last successfully received
    /// DevStatusReq command.
    pub fn margin(&self) -> i8 {
        ((self.0[1] << 2) as i8) >> 2
    }
}

/// DataRateRange represents LoRaWAN DataRateRange.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DataRateRange(u8);

impl DataRateRange {
    /// Constructs a new DataRateRange from lower and upper bounds (both
    /// inclusive).
    pub fn new(min_data_rate: u8, max_data_rate: u8) -> Result<Self, Error> {
        if min_data_rate > 0x0f || max_data_rate > 0x0f {
            return Err(Error::InvalidFieldValue("data rates must be in 0..=15"));
        }
        if max_data_rate < min_data_rate {
            return Err(Error::InvalidFieldValue("max data rate is below the min data rate"));
        }
        Ok(DataRateRange(max_data_rate << 4 | min_data_rate))
    }

    /// The highest data rate allowed on this channel.
    pub fn max_data_rate(&self) -> u8 {
        self.0 >> 4
    }

    /// The lowest data rate allowed on this channel.
    pub fn min_data_rate(&self) -> u8 {
        self.0 & 0x0f
    }

    /// The integer value of the DataRateRange.
    pub fn raw_value(&self) -> u8 {
        self.0
    }
}

impl From<u8> for DataRateRange {
    fn from(v: u8) -> Self {
        DataRateRange(v)
    }
}

impl NewChannelReqPayload {
    /// Creates a NewChannelReq for the given channel slot.
    pub fn new(channel_index: u8, frequency: Frequency, data_rate_range: DataRateRange) -> Self {
        let f = frequency.to_bytes();
        NewChannelReqPayload([channel_index, f[0], f[1], f[2], data_rate_range.raw_value()])
    }

    create_value_reader_fn!(
        /// The index of the channel being created or modified.
        channel_index,
        0
    );

    /// The frequency of the new or modified channel.
    pub fn frequency(&self) -> Frequency {
        Frequency::new_from_raw(&self.0[1..4])
    }

    /// The data rate range specifies allowed data rates for the new or
    /// modified channel.
    pub fn data_rate_range(&self) -> DataRateRange {
        DataRateRange::from(self.0[4])
    }
}

impl NewChannelAnsPayload {
    /// Creates a NewChannelAns from the two acknowledgement bits.
    pub fn new(channel_freq_ack: bool, data_rate_range_ack: bool) -> Self {
        NewChannelAnsPayload([u8::from(channel_freq_ack) | u8::from(data_rate_range_ack) << 1])
    }

    create_ack_fn!(
        /// Whether the channel frequency change was applied successfully.
        channel_freq_ack,
        0
    );

    create_ack_fn!(
        /// Whether the data rate range change was applied successfully.
        data_rate_range_ack,
        1
    );

    /// Whether the device has accepted the new channel.
    pub fn ack(&self) -> bool {
        self.0[0] == 0x03
    }
}

impl RXTimingSetupReqPayload {
    /// Creates a RXTimingSetupReq from the RX1 delay in seconds.
    pub fn new(delay: u8) -> Result<Self, Error> {
        if delay > 0x0f {
            return Err(Error::InvalidFieldValue("delay must be in 0..=15"));
        }
        Ok(RXTimingSetupReqPayload([delay]))
    }

    /// Delay before the first RX window.
    pub fn delay(&self) -> u8 {
        self.0[0] & 0x0f
    }
}

/// Maximum EIRP in dBm, selected by the low four bits of the
/// TXParamSetupReq payload.
const MAX_EIRP_DBM: [u8; 16] = [8, 10, 12, 13, 14, 16, 18, 20, 21, 24, 26, 27, 29, 30, 33, 36];

impl TXParamSetupReqPayload {
    /// Creates a TXParamSetupReq. `max_eirp_index` selects an entry of
    /// the EIRP table.
    pub fn new(
        downlink_dwell_time: bool,
        uplink_dwell_time: bool,
        max_eirp_index: u8,
    ) -> Result<Self, Error> {
        if max_eirp_index > 0x0f {
            return Err(Error::InvalidFieldValue("max_eirp_index must be in 0..=15"));
        }
        Ok(TXParamSetupReqPayload([
            u8::from(downlink_dwell_time) << 5 | u8::from(uplink_dwell_time) << 4 | max_eirp_index,
        ]))
    }

    /// Whether downlinks are limited to a 400 ms dwell time.
    pub fn downlink_dwell_time(&self) -> bool {
        self.0[0] & (1 << 5) != 0
    }

    /// Whether uplinks are limited to a 400 ms dwell time.
    pub fn uplink_dwell_time(&self) -> bool {
        self.0[0] & (1 << 4) != 0
    }

    /// The maximum EIRP the device may use, in dBm.
    pub fn max_eirp(&self) -> u8 {
        MAX_EIRP_DBM[(self.0[0] & 0x0f) as usize]
    }
}

impl DlChannelReqPayload {
    /// Creates a DlChannelReq shifting the downlink of the given channel.
    pub fn new(channel_index: u8, frequency: Frequency) -> Self {
        let f = frequency.to_bytes();
        DlChannelReqPayload([channel_index, f[0], f[1], f[2]])
    }

    create_value_reader_fn!(
        /// The index of the channel being modified.
        channel_index,
        0
    );

    /// The downlink frequency of the channel.
    pub fn frequency(&self) -> Frequency {
        Frequency::new_from_raw(&self.0[1..4])
    }
}

impl DlChannelAnsPayload {
    /// Creates a DlChannelAns from the two acknowledgement bits.
    pub fn new(channel_freq_ack: bool, uplink_freq_exists: bool) -> Self {
        DlChannelAnsPayload([u8::from(channel_freq_ack) | u8::from(uplink_freq_exists) << 1])
    }

    create_ack_fn!(
        /// Channel frequency ok.
        channel_freq_ack,
        0
    );

    create_ack_fn!(
        /// Uplink frequency exists.
        uplink_freq_exists,
        1
    );

    /// Whether the device has accepted the new downlink frequency.
    pub fn ack(&self) -> bool {
        self.0[0] & 0x03 == 0x03
    }
}

impl RekeyIndPayload {
    /// Creates a RekeyInd for the given LoRaWAN minor version.
    pub fn new(minor: u8) -> Result<Self, Error> {
        if minor > 0x0f {
            return Err(Error::InvalidFieldValue("minor version must be in 0..=15"));
        }
        Ok(RekeyIndPayload([minor]))
    }

    /// The LoRaWAN minor version of the device.
    pub fn minor(&self) -> u8 {
        self.0[0] & 0x0f
    }
}

impl RekeyConfPayload {
    /// Creates a RekeyConf for the given LoRaWAN minor version.
    pub fn new(minor: u8) -> Result<Self, Error> {
        if minor > 0x0f {
            return Err(Error::InvalidFieldValue("minor version must be in 0..=15"));
        }
        Ok(RekeyConfPayload([minor]))
    }

    /// The LoRaWAN minor version the network commits to.
    pub fn minor(&self) -> u8 {
        self.0[0] & 0x0f
    }
}

impl ADRParamSetupReqPayload {
    /// Creates an ADRParamSetupReq from the ADR_ACK exponents.
    pub fn new(limit_exp: u8, delay_exp: u8) -> Result<Self, Error> {
        if limit_exp > 0x0f {
            return Err(Error::InvalidFieldValue("limit_exp must be in 0..=15"));
        }
        if delay_exp > 0x0f {
            return Err(Error::InvalidFieldValue("delay_exp must be in 0..=15"));
        }
        Ok(ADRParamSetupReqPayload([limit_exp << 4 | delay_exp]))
    }

    /// The ADR_ACK_LIMIT exponent.
    pub fn limit_exp(&self) -> u8 {
        self.0[0] >> 4
    }

    /// The ADR_ACK_DELAY exponent.
    pub fn delay_exp(&self) -> u8 {
        self.0[0] & 0x0f
    }
}

/// Nanoseconds per 1/256 s fractional unit of a DeviceTimeAns.
const FRACTIONAL_SECOND_NANOS: u32 = 3_906_250;

impl DeviceTimeAnsPayload {
    /// Creates a DeviceTimeAns from seconds since the GPS epoch plus
    /// fractional 1/256 s units.
    pub fn new(seconds: u32, fractions: u8) -> Self {
        let s = seconds.to_le_bytes();
        DeviceTimeAnsPayload([s[0], s[1], s[2], s[3], fractions])
    }

    /// Seconds since the GPS epoch.
    pub fn seconds(&self) -> u32 {
        u32::from_le_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// The fractional part in 1/256 s units.
    pub fn fractions(&self) -> u8 {
        self.0[4]
    }

    /// The fractional part in nanoseconds.
    pub fn nano_seconds(&self) -> u32 {
        u32::from(self.0[4]) * FRACTIONAL_SECOND_NANOS
    }
}

impl ForceRejoinReqPayload {
    /// Creates a ForceRejoinReq. The rejoin type must be 0 or 2.
    pub fn new(period: u8, max_retries: u8, rejoin_type: u8, data_rate: u8) -> Result<Self, Error> {
        if period > 0x07 {
            return Err(Error::InvalidFieldValue("period must be in 0..=7"));
        }
        if max_retries > 0x07 {
            return Err(Error::InvalidFieldValue("max_retries must be in 0..=7"));
        }
        if rejoin_type != 0 && rejoin_type != 2 {
            return Err(Error::InvalidFieldValue("rejoin_type must be 0 or 2"));
        }
        if data_rate > 0x0f {
            return Err(Error::InvalidFieldValue("data_rate must be in 0..=15"));
        }
        Ok(ForceRejoinReqPayload([rejoin_type << 4 | data_rate, period << 3 | max_retries]))
    }

    /// The delay between retransmissions: 32 × 2^period seconds, with
    /// jitter added by the device.
    pub fn period(&self) -> u8 {
        (self.0[1] >> 3) & 0x07
    }

    /// The total number of rejoin-request retries.
    pub fn max_retries(&self) -> u8 {
        self.0[1] & 0x07
    }

    /// The rejoin-request type the device must transmit (0 or 2).
    pub fn rejoin_type(&self) -> u8 {
        (self.0[0] >> 4) & 0x07
    }

    /// The data rate for the rejoin-request transmissions.
    pub fn data_rate(&self) -> u8 {
        self.0[0] & 0x0f
    }
}

impl RejoinParamSetupReqPayload {
    /// Creates a RejoinParamSetupReq from the MaxTimeN and MaxCountN
    /// exponents.
    pub fn new(max_time_n: u8, max_count_n: u8) -> Result<Self, Error> {
        if max_time_n > 0x0f {
            return Err(Error::InvalidFieldValue("max_time_n must be in 0..=15"));
        }
        if max_count_n > 0x0f {
            return Err(Error::InvalidFieldValue("max_count_n must be in 0..=15"));
        }
        Ok(RejoinParamSetupReqPayload([max_time_n << 4 | max_count_n]))
    }

    /// The MaxTimeN exponent.
    pub fn max_time_n(&self) -> u8 {
        self.0[0] >> 4
    }

    /// The MaxCountN exponent.
    pub fn max_count_n(&self) -> u8 {
        self.0[0] & 0x0f
    }
}

impl RejoinParamSetupAnsPayload {
    /// Creates a RejoinParamSetupAns.
    pub fn new(time_ok: bool) -> Self {
        RejoinParamSetupAnsPayload([u8::from(time_ok)])
    }

    create_ack_fn!(
        /// Whether the device accepted the time-based rejoin period.
        time_ok,
        0
    );
}

impl PingSlotInfoReqPayload {
    /// Creates a PingSlotInfoReq from the ping-slot periodicity exponent.
    pub fn new(periodicity: u8) -> Result<Self, Error> {
        if periodicity > 0x07 {
            return Err(Error::InvalidFieldValue("periodicity must be in 0..=7"));
        }
        Ok(PingSlotInfoReqPayload([periodicity]))
    }

    /// The ping-slot period: 2^periodicity seconds.
    pub fn periodicity(&self) -> u8 {
        self.0[0] & 0x07
    }
}

impl PingSlotChannelReqPayload {
    /// Creates a PingSlotChannelReq carrying the ping-slot frequency and
    /// data rate.
    pub fn new(frequency: Frequency, data_rate: u8) -> Result<Self, Error> {
        if data_rate > 0x0f {
            return Err(Error::InvalidFieldValue("data_rate must be in 0..=15"));
        }
        let f = frequency.to_bytes();
        Ok(PingSlotChannelReqPayload([f[0], f[1], f[2], data_rate]))
    }

    /// The frequency used for ping slots.
    pub fn frequency(&self) -> Frequency {
        Frequency::new_from_raw(&self.0[0..3])
    }

    /// The data rate used for ping slots.
    pub fn data_rate(&self) -> u8 {
        self.0[3] & 0x0f
    }
}

impl PingSlotChannelAnsPayload {
    /// Creates a PingSlotChannelAns from the two acknowledgement bits.
    pub fn new(channel_freq_ok: bool, data_rate_ok: bool) -> Self {
        PingSlotChannelAnsPayload([u8::from(channel_freq_ok) | u8::from(data_rate_ok) << 1])
    }

    create_ack_fn!(
        /// Channel frequency ok.
        channel_freq_ok,
        0
    );

    create_ack_fn!(
        /// Data rate ok.
        data_rate_ok,
        1
    );
}

impl BeaconFreqReqPayload {
    /// Creates a BeaconFreqReq carrying the beacon frequency.
    pub fn new(frequency: Frequency) -> Self {
        let f = frequency.to_bytes();
        BeaconFreqReqPayload([f[0], f[1], f[2]])
    }

    /// The frequency the device should expect beacons on.
    pub fn frequency(&self) -> Frequency {
        Frequency::new_from_raw(&self.0)
    }
}

impl BeaconFreqAnsPayload {
    /// Creates a BeaconFreqAns.
    pub fn new(beacon_freq_ok: bool) -> Self {
        BeaconFreqAnsPayload([u8::from(beacon_freq_ok)])
    }

    create_ack_fn!(
        /// Whether the device accepted the beacon frequency.
        beacon_freq_ok,
        0
    );
}
