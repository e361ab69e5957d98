use lorawan_codec::join::{CFList, JoinRequestPayload};
use lorawan_codec::keys::{AES128Key, MIC};
use lorawan_codec::maccommands::{LinkADRAnsPayload, LinkCheckReqPayload, MacCommand};
use lorawan_codec::macpayload::{FCtrl, FHDR, FOpts, FRMPayload, MACPayload};
use lorawan_codec::phy::{parse, MHDR, MType, Payload, PhyPayload};
use lorawan_codec::types::{DLSettings, DevAddr, DevNonce, Frequency, NetID};

fn phy_join_request_payload() -> Vec<u8> {
    vec![
        0x00, 0x04, 0x03, 0x02, 0x01, 0x04, 0x03, 0x02, 0x01, 0x05, 0x04, 0x03, 0x02, 0x05, 0x04,
        0x03, 0x02, 0x2d, 0x10, 0x6a, 0x99, 0x0e, 0x12,
    ]
}

fn phy_join_accept_payload() -> Vec<u8> {
    vec![
        0x20, 0x49, 0x3e, 0xeb, 0x51, 0xfb, 0xa2, 0x11, 0x6f, 0x81, 0x0e, 0xdb, 0x37, 0x42, 0x97,
        0x51, 0x42,
    ]
}

fn phy_join_accept_payload_with_c_f_list() -> Vec<u8> {
    // 867100000, 867300000, 867500000, 867700000, 867900000
    vec![
        0x20, 0xe4, 0x56, 0x73, 0xb6, 0x3c, 0xb4, 0xb9, 0xce, 0xcb, 0x2a, 0xa8, 0x3f, 0x03, 0x33,
        0xe6, 0x15, 0xd2, 0xac, 0x89, 0xee, 0xa1, 0x65, 0x98, 0x37, 0xc3, 0xaa, 0x6d, 0xf9, 0x68,
        0x98, 0x89, 0xcf,
    ]
}

fn phy_dataup_payload() -> Vec<u8> {
    vec![
        0x40, 0x04, 0x03, 0x02, 0x01, 0x80, 0x01, 0x00, 0x01, 0xa6, 0x94, 0x64, 0x26, 0x15, 0xd6,
        0xc3, 0xb5, 0x82,
    ]
}

fn phy_datadown_payload() -> Vec<u8> {
    vec![
        0xa0, 0x04, 0x03, 0x02, 0x01, 0x80, 0xff, 0x2a, 0x2a, 0x0a, 0xf1, 0xa3, 0x6a, 0x05, 0xd0,
        0x12, 0x5f, 0x88, 0x5d, 0x88, 0x1d, 0x49, 0xe1,
    ]
}

fn data_payload_with_fport_zero() -> Vec<u8> {
    vec![
        0x40, 0x04, 0x03, 0x02, 0x01, 0x00, 0x00, 0x00, 0x00, 0x69, 0x36, 0x9e, 0xee, 0x6a, 0xa5,
        0x08,
    ]
}

fn data_payload_with_f_opts() -> Vec<u8> {
    vec![
        0x40, 0x04, 0x03, 0x02, 0x01, 0x03, 0x00, 0x00, 0x02, 0x03, 0x05, 0xd7, 0xfa, 0x0c, 0x6c,
    ]
}

fn app_key() -> AES128Key {
    "00112233445566778899aabbccddeeff".parse().unwrap()
}

fn nwk_s_key() -> AES128Key {
    AES128Key::from([2; 16])
}

fn app_s_key() -> AES128Key {
    AES128Key::from([1; 16])
}

fn mac_payload(phy: &PhyPayload) -> &MACPayload {
    match &phy.payload {
        Payload::MacPayload(p) => p,
        other => panic!("expected a MACPayload, got {:?}", other),
    }
}

#[test]
fn parse_data_uplink_frame() {
    let mut phy = parse(&phy_dataup_payload()).unwrap();

    assert_eq!(phy.mhdr.m_type, MType::UnconfirmedDataUp);
    assert_eq!(phy.mic, MIC([0xd6, 0xc3, 0xb5, 0x82]));
    {
        let mac = mac_payload(&phy);
        assert_eq!(mac.fhdr.dev_addr.to_string(), "01020304");
        assert_eq!(mac.fhdr.f_cnt, 1);
        assert!(mac.fhdr.f_ctrl.adr);
        assert!(!mac.fhdr.f_ctrl.ack);
        assert!(!mac.fhdr.f_ctrl.class_b);
        assert_eq!(mac.f_port, Some(1));
    }

    assert!(phy.validate_mic(&nwk_s_key()).unwrap());
    assert!(!phy.validate_mic(&app_s_key()).unwrap());

    phy.decrypt_frm_payload(&app_s_key()).unwrap();
    assert_eq!(
        mac_payload(&phy).frm_payload,
        Some(FRMPayload::Data(b"hello".to_vec()))
    );
}

#[test]
fn parse_then_encode_is_identity() {
    for frame in [
        phy_join_request_payload(),
        phy_join_accept_payload(),
        phy_join_accept_payload_with_c_f_list(),
        phy_dataup_payload(),
        phy_datadown_payload(),
        data_payload_with_fport_zero(),
        data_payload_with_f_opts(),
    ] {
        let phy = parse(&frame).unwrap();
        assert_eq!(phy.to_vec().unwrap(), frame);
    }
}

#[test]
fn data_mic_mismatch_after_mutation() {
    let mut bytes = phy_dataup_payload();
    bytes[8] = 0xee;
    let phy = parse(&bytes).unwrap();
    assert!(!phy.validate_mic(&nwk_s_key()).unwrap());
}

#[test]
fn build_data_uplink_frame() {
    let mut phy = PhyPayload::new(
        MHDR::new(MType::UnconfirmedDataUp),
        Payload::MacPayload(MACPayload {
            fhdr: FHDR {
                dev_addr: "01020304".parse().unwrap(),
                f_ctrl: FCtrl { adr: true, ..Default::default() },
                f_cnt: 1,
                f_opts: FOpts::default(),
            },
            f_port: Some(1),
            frm_payload: Some(FRMPayload::Data(b"hello".to_vec())),
        }),
    );
    phy.encrypt_frm_payload(&app_s_key()).unwrap();
    phy.set_mic(&nwk_s_key()).unwrap();
    assert_eq!(phy.to_vec().unwrap(), phy_dataup_payload());
}

#[test]
fn build_data_downlink_frame() {
    let mut phy = PhyPayload::new(
        MHDR::new(MType::ConfirmedDataDown),
        Payload::MacPayload(MACPayload {
            fhdr: FHDR {
                dev_addr: "01020304".parse().unwrap(),
                f_ctrl: FCtrl { adr: true, ..Default::default() },
                f_cnt: 76543,
                f_opts: FOpts::default(),
            },
            f_port: Some(42),
            frm_payload: Some(FRMPayload::Data(b"hello lora".to_vec())),
        }),
    );
    phy.encrypt_frm_payload(&app_s_key()).unwrap();
    phy.set_mic(&nwk_s_key()).unwrap();
    assert_eq!(phy.to_vec().unwrap(), phy_datadown_payload());
}

#[test]
fn parse_data_downlink_with_full_counter() {
    let mut phy = parse(&phy_datadown_payload()).unwrap();
    // only the low 16 counter bits travel on the wire
    assert_eq!(mac_payload(&phy).fhdr.f_cnt, 76543 & 0xffff);

    // the session counter must be restored before MIC checks
    if let Payload::MacPayload(mac) = &mut phy.payload {
        mac.fhdr.f_cnt = 76543;
    }
    assert!(phy.validate_mic(&nwk_s_key()).unwrap());
    phy.decrypt_frm_payload(&app_s_key()).unwrap();
    assert_eq!(
        mac_payload(&phy).frm_payload,
        Some(FRMPayload::Data(b"hello lora".to_vec()))
    );
}

fn port_zero_commands() -> Vec<MacCommand> {
    vec![
        MacCommand::LinkCheckReq(LinkCheckReqPayload::new()),
        MacCommand::LinkADRAns(LinkADRAnsPayload::new(true, false, true)),
    ]
}

#[test]
fn build_frame_with_mac_commands_in_frm_payload() {
    let mut phy = PhyPayload::new(
        MHDR::new(MType::UnconfirmedDataUp),
        Payload::MacPayload(MACPayload {
            fhdr: FHDR { dev_addr: "01020304".parse().unwrap(), ..Default::default() },
            f_port: Some(0),
            frm_payload: Some(FRMPayload::MacCommands(port_zero_commands())),
        }),
    );
    phy.encrypt_frm_payload(&app_s_key()).unwrap();
    phy.set_mic(&app_s_key()).unwrap();
    assert_eq!(phy.to_vec().unwrap(), data_payload_with_fport_zero());
}

#[test]
fn decrypt_and_decode_port_zero_commands() {
    let mut phy = parse(&data_payload_with_fport_zero()).unwrap();
    assert!(phy.validate_mic(&app_s_key()).unwrap());
    phy.decrypt_frm_payload(&app_s_key()).unwrap();
    phy.decode_frm_payload().unwrap();
    assert_eq!(
        mac_payload(&phy).frm_payload,
        Some(FRMPayload::MacCommands(port_zero_commands()))
    );
}

#[test]
fn build_frame_with_mac_commands_in_f_opts() {
    let mut phy = PhyPayload::new(
        MHDR::new(MType::UnconfirmedDataUp),
        Payload::MacPayload(MACPayload {
            fhdr: FHDR {
                dev_addr: "01020304".parse().unwrap(),
                f_opts: FOpts::MacCommands(port_zero_commands()),
                ..Default::default()
            },
            f_port: None,
            frm_payload: None,
        }),
    );
    phy.set_mic(&app_s_key()).unwrap();
    assert_eq!(phy.to_vec().unwrap(), data_payload_with_f_opts());
}

#[test]
fn decode_f_opts_of_downlink_frame() {
    let data = vec![
        0x60, 0x5f, 0x3b, 0xd7, 0x4e, 0x0a, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x70, 0x03, 0x00,
        0xff, 0x00, 0x30, 0xcd, 0xdb, 0x22, 0xee,
    ];
    let mut phy = parse(&data).unwrap();
    assert_eq!(phy.mhdr.m_type, MType::UnconfirmedDataDown);
    phy.decode_f_opts().unwrap();

    match &mac_payload(&phy).fhdr.f_opts {
        FOpts::MacCommands(cmds) => {
            assert_eq!(cmds.len(), 2);
            for cmd in cmds {
                assert!(matches!(cmd, MacCommand::LinkADRReq(_)), "unexpected command {:?}", cmd);
            }
        }
        other => panic!("FOpts still raw: {:?}", other),
    }
}

#[test]
fn parse_join_request_frame() {
    let phy = parse(&phy_join_request_payload()).unwrap();
    assert_eq!(phy.mhdr.m_type, MType::JoinRequest);
    match &phy.payload {
        Payload::JoinRequest(join) => {
            assert_eq!(join.join_eui.to_string(), "0102030401020304");
            assert_eq!(join.dev_eui.to_string(), "0203040502030405");
            assert_eq!(u16::from(join.dev_nonce), 0x102d);
        }
        other => panic!("expected a join-request payload, got {:?}", other),
    }
    assert!(phy.validate_mic(&app_s_key()).unwrap());
    assert!(!phy.validate_mic(&nwk_s_key()).unwrap());
}

#[test]
fn build_join_request_frame() {
    let mut phy = PhyPayload::new(
        MHDR::new(MType::JoinRequest),
        Payload::JoinRequest(JoinRequestPayload {
            join_eui: "0102030401020304".parse().unwrap(),
            dev_eui: "0203040502030405".parse().unwrap(),
            dev_nonce: DevNonce::new(0x102d),
        }),
    );
    phy.set_mic(&app_s_key()).unwrap();
    assert_eq!(phy.to_vec().unwrap(), phy_join_request_payload());
}

#[test]
fn decrypt_join_accept_frame() {
    let mut phy = parse(&phy_join_accept_payload()).unwrap();
    assert_eq!(phy.mhdr.m_type, MType::JoinAccept);
    assert!(matches!(phy.payload, Payload::Raw(_)));

    phy.decrypt_join_accept_payload(&app_key()).unwrap();
    match &phy.payload {
        Payload::JoinAccept(accept) => {
            assert_eq!(accept.join_nonce.to_string(), "570bc7");
            assert_eq!(accept.home_net_id.to_string(), "221101");
            assert_eq!(accept.dev_addr.to_string(), "02031980");
            assert_eq!(accept.dl_settings.raw_value(), 0);
            assert_eq!(accept.rx_delay, 0);
            assert_eq!(accept.c_f_list, None);
        }
        other => panic!("expected a join-accept payload, got {:?}", other),
    }
    assert_eq!(phy.mic.to_string(), "43485bbc");
    assert!(phy.validate_mic(&app_key()).unwrap());

    // the reverse direction restores the original frame
    phy.encrypt_join_accept_payload(&app_key()).unwrap();
    assert_eq!(phy.to_vec().unwrap(), phy_join_accept_payload());
}

#[test]
fn decrypt_join_accept_frame_with_c_f_list() {
    let mut phy = parse(&phy_join_accept_payload_with_c_f_list()).unwrap();
    phy.decrypt_join_accept_payload(&app_s_key()).unwrap();
    assert!(phy.validate_mic(&app_s_key()).unwrap());

    match &phy.payload {
        Payload::JoinAccept(accept) => {
            assert_eq!(accept.join_nonce.to_string(), "010203");
            assert_eq!(accept.dl_settings.rx1_dr_offset(), 1);
            assert_eq!(accept.dl_settings.rx2_data_rate(), 2);
            assert_eq!(accept.rx_delay, 3);
            let expected = [
                Frequency::new(867_100_000).unwrap(),
                Frequency::new(867_300_000).unwrap(),
                Frequency::new(867_500_000).unwrap(),
                Frequency::new(867_700_000).unwrap(),
                Frequency::new(867_900_000).unwrap(),
            ];
            assert_eq!(accept.c_f_list, Some(CFList::Channels(expected)));
        }
        other => panic!("expected a join-accept payload, got {:?}", other),
    }
}

#[test]
fn derive_session_keys() {
    let join_request = parse(&phy_join_request_payload()).unwrap();
    let dev_nonce = match &join_request.payload {
        Payload::JoinRequest(p) => p.dev_nonce,
        _ => unreachable!(),
    };

    let mut phy = parse(&phy_join_accept_payload()).unwrap();
    phy.decrypt_join_accept_payload(&app_key()).unwrap();
    let accept = match &phy.payload {
        Payload::JoinAccept(p) => p.clone(),
        _ => unreachable!(),
    };

    let nwk_s_key = accept.derive_nwk_s_key(dev_nonce, &app_key());
    assert_eq!(
        nwk_s_key,
        AES128Key::from([
            0x7b, 0xb2, 0x5f, 0x89, 0xe0, 0xd1, 0x37, 0x1e, 0x1f, 0xbf, 0x4d, 0x99, 0x7e, 0x14,
            0x68, 0xa3,
        ])
    );

    let app_s_key = accept.derive_app_s_key(dev_nonce, &app_key());
    assert_eq!(
        app_s_key,
        AES128Key::from([
            0x14, 0x88, 0x20, 0xdf, 0xb1, 0xe0, 0xc9, 0xd6, 0x28, 0x9c, 0xde, 0x16, 0xc1, 0xaf,
            0x24, 0x9f,
        ])
    );
}

#[test]
fn mic_gated_decryption() {
    let mut phy = parse(&phy_dataup_payload()).unwrap();
    assert!(!phy.decrypt_frm_payload_if_mic_ok(&app_s_key(), &app_s_key()).unwrap());
    // a failed check leaves the payload encrypted
    assert_ne!(
        mac_payload(&phy).frm_payload,
        Some(FRMPayload::Data(b"hello".to_vec()))
    );

    assert!(phy.decrypt_frm_payload_if_mic_ok(&nwk_s_key(), &app_s_key()).unwrap());
    assert_eq!(
        mac_payload(&phy).frm_payload,
        Some(FRMPayload::Data(b"hello".to_vec()))
    );
}

#[test]
fn parse_rejects_short_frames() {
    assert!(parse(&[0x40, 0x01, 0x02, 0x03]).is_err());
    // a data frame needs MHDR + FHDR + MIC
    let bytes = vec![0x80, 0x04, 0x03, 0x02, 0x01, 0x00, 0xff, 0x01, 0x02, 0x03, 0x04];
    assert!(parse(&bytes).is_err());
}

#[test]
fn f_port_can_be_absent() {
    let bytes = vec![0x80, 0x04, 0x03, 0x02, 0x01, 0x00, 0xff, 0x04, 0x01, 0x02, 0x03, 0x04];
    let phy = parse(&bytes).unwrap();
    assert_eq!(mac_payload(&phy).f_port, None);
    assert_eq!(mac_payload(&phy).frm_payload, None);
}

#[test]
fn dev_addr_net_id_classification() {
    let cases: [(&str, u8, u32); 3] = [
        ("5bffffff", 0, 0x2d),
        ("d6dfffff", 2, 0x016d),
        ("fd6db7ff", 6, 0x5b6d),
    ];
    for (text, net_id_type, nwk_id) in cases {
        let addr: DevAddr = text.parse().unwrap();
        assert_eq!(addr.net_id_type(), net_id_type, "{}", text);
        assert_eq!(addr.nwk_id(), nwk_id, "{}", text);
    }
}

#[test]
fn dev_addr_prefix_assignment() {
    let net_id: NetID = "000011".parse().unwrap();
    let mut addr: DevAddr = "ffffffff".parse().unwrap();
    addr.set_addr_prefix(&net_id);
    assert_eq!(addr.to_string(), "23ffffff");
    assert!(addr.is_net_id(&net_id));
    assert_eq!(addr.net_id_type(), 0);

    // idempotent for a matching NetID
    let once = addr;
    addr.set_addr_prefix(&net_id);
    assert_eq!(addr, once);
}

#[test]
fn dl_settings_packing() {
    let settings = DLSettings::new(true, 7, 15).unwrap();
    assert_eq!(settings.raw_value(), 0xff);
    assert_eq!(settings.to_string(), "ff");
    assert_eq!("ff".parse::<DLSettings>().unwrap(), settings);

    let settings = DLSettings::from(0xcb);
    assert!(settings.opt_neg());
    assert_eq!(settings.rx1_dr_offset(), 4);
    assert_eq!(settings.rx2_data_rate(), 11);

    assert!(DLSettings::new(false, 8, 0).is_err());
    assert!(DLSettings::new(false, 0, 16).is_err());
}

#[test]
fn rejoin_request_frame_round_trip() {
    use lorawan_codec::join::RejoinRequestType02Payload;

    let mut phy = PhyPayload::new(
        MHDR::new(MType::RejoinRequest),
        Payload::RejoinRequestType02(RejoinRequestType02Payload {
            rejoin_type: 2,
            net_id: "010203".parse().unwrap(),
            dev_eui: "0203040502030405".parse().unwrap(),
            rj_count0: 0x1234,
        }),
    );
    phy.set_mic(&nwk_s_key()).unwrap();
    let bytes = phy.to_vec().unwrap();
    assert_eq!(bytes.len(), 19);

    let parsed = parse(&bytes).unwrap();
    assert_eq!(parsed, phy);
    assert!(parsed.validate_mic(&nwk_s_key()).unwrap());
    assert!(!parsed.validate_mic(&app_s_key()).unwrap());

    let json = phy.to_json().unwrap();
    assert_eq!(PhyPayload::from_json(&json).unwrap(), phy);
}

#[test]
fn proprietary_frame_is_opaque() {
    let bytes = vec![0xe0, 0xaa, 0xbb, 0xcc, 0x01, 0x02, 0x03, 0x04];
    let mut phy = parse(&bytes).unwrap();
    assert_eq!(phy.mhdr.m_type, MType::Proprietary);
    assert_eq!(phy.payload, Payload::Raw(vec![0xaa, 0xbb, 0xcc]));
    assert_eq!(phy.to_vec().unwrap(), bytes);
    // no MIC scheme is defined for proprietary frames
    assert!(phy.set_mic(&nwk_s_key()).is_err());
    assert!(phy.validate_mic(&nwk_s_key()).is_err());

    let json = phy.to_json().unwrap();
    assert_eq!(PhyPayload::from_json(&json).unwrap(), phy);
}

#[test]
fn json_data_frame_shape_and_round_trip() {
    let mut phy = parse(&phy_dataup_payload()).unwrap();
    let json = phy.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["mhdr"]["mType"], "UnconfirmedDataUp");
    assert_eq!(value["mhdr"]["major"], "LoRaWANR1");
    assert_eq!(value["macPayload"]["fhdr"]["devAddr"], "01020304");
    assert_eq!(value["macPayload"]["fhdr"]["fCtrl"]["adr"], true);
    assert_eq!(value["macPayload"]["fhdr"]["fCnt"], 1);
    assert_eq!(value["macPayload"]["fPort"], 1);
    assert_eq!(value["mic"], "d6c3b582");
    assert_eq!(PhyPayload::from_json(&json).unwrap(), phy);

    // decoded MAC commands survive the JSON form too
    phy.decrypt_frm_payload(&app_s_key()).unwrap();
    let json = phy.to_json().unwrap();
    assert_eq!(PhyPayload::from_json(&json).unwrap(), phy);
}

#[test]
fn json_round_trip_of_command_frames() {
    let mut phy = parse(&data_payload_with_fport_zero()).unwrap();
    phy.decrypt_frm_payload(&app_s_key()).unwrap();
    phy.decode_frm_payload().unwrap();
    let json = phy.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["macPayload"]["frmPayload"][0]["cid"], 0x02);
    assert_eq!(value["macPayload"]["frmPayload"][1]["cid"], 0x03);
    assert_eq!(value["macPayload"]["frmPayload"][1]["payload"], "05");
    assert_eq!(PhyPayload::from_json(&json).unwrap(), phy);
}

#[test]
fn json_round_trip_of_join_frames() {
    let phy = parse(&phy_join_request_payload()).unwrap();
    let json = phy.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["macPayload"]["joinEUI"], "0102030401020304");
    assert_eq!(value["macPayload"]["devNonce"], 0x102d);
    assert_eq!(PhyPayload::from_json(&json).unwrap(), phy);

    // an encrypted join-accept serializes as opaque bytes
    let mut phy = parse(&phy_join_accept_payload()).unwrap();
    let json = phy.to_json().unwrap();
    assert_eq!(PhyPayload::from_json(&json).unwrap(), phy);

    // the decrypted form is structural
    phy.decrypt_join_accept_payload(&app_key()).unwrap();
    let json = phy.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["macPayload"]["joinNonce"], "570bc7");
    assert_eq!(value["macPayload"]["homeNetID"], "221101");
    assert_eq!(PhyPayload::from_json(&json).unwrap(), phy);
}
