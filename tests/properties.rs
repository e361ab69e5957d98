//! Round-trip and idempotence properties over randomly generated frames.

use proptest::prelude::*;

use lorawan_codec::join::JoinAcceptPayload;
use lorawan_codec::keys::AES128Key;
use lorawan_codec::macpayload::{FCtrl, FHDR, FOpts, FRMPayload, MACPayload};
use lorawan_codec::phy::{parse, MHDR, MType, Payload, PhyPayload};
use lorawan_codec::types::{DLSettings, DevAddr, Frequency, NetID};

fn arb_frequency() -> impl Strategy<Value = Frequency> {
    (0u32..(1 << 24)).prop_map(|v| Frequency::new(v * 100).unwrap())
}

fn arb_key() -> impl Strategy<Value = AES128Key> {
    any::<[u8; 16]>().prop_map(AES128Key::from)
}

fn arb_data_frame() -> impl Strategy<Value = PhyPayload> {
    (
        any::<bool>(),
        any::<bool>(),
        any::<[u8; 4]>(),
        0u32..0x1_0000,
        1u8..=255,
        proptest::collection::vec(any::<u8>(), 1..48),
    )
        .prop_map(|(uplink, confirmed, dev_addr, f_cnt, f_port, data)| {
            let m_type = match (uplink, confirmed) {
                (true, false) => MType::UnconfirmedDataUp,
                (true, true) => MType::ConfirmedDataUp,
                (false, false) => MType::UnconfirmedDataDown,
                (false, true) => MType::ConfirmedDataDown,
            };
            PhyPayload::new(
                MHDR::new(m_type),
                Payload::MacPayload(MACPayload {
                    fhdr: FHDR {
                        dev_addr: DevAddr::from(dev_addr),
                        f_ctrl: FCtrl { adr: uplink, ..Default::default() },
                        f_cnt,
                        f_opts: FOpts::default(),
                    },
                    f_port: Some(f_port),
                    frm_payload: Some(FRMPayload::Data(data)),
                }),
            )
        })
}

proptest! {
    #[test]
    fn frequency_round_trip(freq in arb_frequency()) {
        let bytes = freq.to_bytes();
        prop_assert_eq!(Frequency::from_bytes(&bytes).unwrap(), freq);
    }

    #[test]
    fn dev_addr_text_round_trip(bytes in any::<[u8; 4]>()) {
        let addr = DevAddr::new(bytes);
        let text = addr.to_string();
        prop_assert_eq!(text.parse::<DevAddr>().unwrap(), addr);
    }

    #[test]
    fn dev_addr_prefix_laws(addr_bytes in any::<[u8; 4]>(), net_id_bytes in any::<[u8; 3]>()) {
        let net_id = NetID::new(net_id_bytes);
        let mut addr = DevAddr::new(addr_bytes);
        addr.set_addr_prefix(&net_id);

        prop_assert_eq!(addr.net_id_type(), net_id.net_id_type());
        prop_assert!(addr.is_net_id(&net_id));

        let once = addr;
        addr.set_addr_prefix(&net_id);
        prop_assert_eq!(addr, once);
    }

    #[test]
    fn data_frame_binary_round_trip(phy in arb_data_frame(), key in arb_key()) {
        let mut phy = phy;
        phy.set_mic(&key).unwrap();
        let bytes = phy.to_vec().unwrap();
        let parsed = parse(&bytes).unwrap();
        prop_assert_eq!(&parsed, &phy);
        prop_assert_eq!(parsed.to_vec().unwrap(), bytes);
    }

    #[test]
    fn data_frame_json_round_trip(phy in arb_data_frame()) {
        let json = phy.to_json().unwrap();
        prop_assert_eq!(PhyPayload::from_json(&json).unwrap(), phy);
    }

    #[test]
    fn frm_payload_cipher_is_an_involution(phy in arb_data_frame(), key in arb_key()) {
        let mut roundtripped = phy.clone();
        roundtripped.encrypt_frm_payload(&key).unwrap();
        roundtripped.decrypt_frm_payload(&key).unwrap();
        prop_assert_eq!(roundtripped, phy);
    }

    #[test]
    fn data_mic_is_deterministic_and_binding(phy in arb_data_frame(), key in arb_key()) {
        let mut phy = phy;
        phy.set_mic(&key).unwrap();
        prop_assert!(phy.validate_mic(&key).unwrap());

        // a damaged MIC never validates
        let mut damaged = phy.clone();
        damaged.mic.0[0] ^= 0xff;
        prop_assert!(!damaged.validate_mic(&key).unwrap());

        // a damaged payload byte invalidates the stored MIC
        let mut bytes = phy.to_vec().unwrap();
        let index = bytes.len() - 5;
        bytes[index] ^= 0x01;
        let damaged = parse(&bytes).unwrap();
        prop_assert!(!damaged.validate_mic(&key).unwrap());
    }

    #[test]
    fn join_accept_cipher_round_trip(
        join_nonce in any::<[u8; 3]>(),
        net_id in any::<[u8; 3]>(),
        dev_addr in any::<[u8; 4]>(),
        dl_settings in any::<u8>(),
        rx_delay in 0u8..=15,
        key in arb_key(),
    ) {
        let mut phy = PhyPayload::new(
            MHDR::new(MType::JoinAccept),
            Payload::JoinAccept(JoinAcceptPayload {
                join_nonce: join_nonce.into(),
                home_net_id: NetID::new(net_id),
                dev_addr: DevAddr::new(dev_addr),
                dl_settings: DLSettings::from(dl_settings),
                rx_delay,
                c_f_list: None,
            }),
        );
        phy.set_mic(&key).unwrap();
        let reference = phy.clone();

        phy.encrypt_join_accept_payload(&key).unwrap();
        let bytes = phy.to_vec().unwrap();
        prop_assert_eq!(bytes.len(), 17);

        let mut parsed = parse(&bytes).unwrap();
        parsed.decrypt_join_accept_payload(&key).unwrap();
        prop_assert_eq!(&parsed, &reference);
        prop_assert!(parsed.validate_mic(&key).unwrap());
    }
}
