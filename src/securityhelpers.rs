//! The cryptographic core: MIC calculation for the four frame flavours,
//! the FRMPayload counter-mode cipher and the join-accept block swap.
//!
//! Every function creates a fresh AES/CMAC instance from the caller's key,
//! so the module holds no state and the callers stay `Send`/`Sync`.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;
use cmac::{Cmac, Mac};

use crate::keys::{AES128Key, MIC};
use crate::types::DevAddr;
use crate::{Direction, Error};

fn new_cmac(key: &AES128Key) -> Cmac<Aes128> {
    <Cmac<Aes128> as Mac>::new(GenericArray::from_slice(&key.0))
}

fn new_aes(key: &AES128Key) -> Aes128 {
    Aes128::new(GenericArray::from_slice(&key.0))
}

/// Builds the 16-byte pseudo-header shared by the data MIC (first byte
/// 0x49) and the FRMPayload keystream blocks (first byte 0x01). Bytes 14
/// and 15 are left for the caller.
fn generate_helper_block(first: u8, direction: Direction, dev_addr: &DevAddr, fcnt: u32) -> [u8; 16] {
    let mut block = [0u8; 16];
    block[0] = first;
    // bytes 1..=4 stay zero
    block[5] = direction.byte();
    block[6..10].copy_from_slice(&dev_addr.to_bytes());
    block[10..14].copy_from_slice(&fcnt.to_le_bytes());
    block
}

fn data_mac(
    data: &[u8],
    key: &AES128Key,
    fcnt: u32,
    direction: Direction,
    dev_addr: &DevAddr,
) -> Cmac<Aes128> {
    let mut b0 = generate_helper_block(0x49, direction, dev_addr, fcnt);
    b0[15] = data.len() as u8;

    let mut mac = new_cmac(key);
    mac.update(&b0);
    mac.update(data);
    mac
}

fn truncate(mac: Cmac<Aes128>) -> MIC {
    let result = mac.finalize().into_bytes();
    let mut mic = [0u8; 4];
    mic.copy_from_slice(&result[0..4]);
    MIC(mic)
}

/// Computes the MIC of a data frame: CMAC over B0 || MHDR || MACPayload,
/// truncated to four bytes.
pub(crate) fn calculate_data_mic(
    data: &[u8],
    key: &AES128Key,
    fcnt: u32,
    direction: Direction,
    dev_addr: &DevAddr,
) -> MIC {
    truncate(data_mac(data, key, fcnt, direction, dev_addr))
}

/// Verifies a data-frame MIC in constant time.
pub(crate) fn verify_data_mic(
    data: &[u8],
    key: &AES128Key,
    fcnt: u32,
    direction: Direction,
    dev_addr: &DevAddr,
    mic: &MIC,
) -> bool {
    data_mac(data, key, fcnt, direction, dev_addr).verify_truncated_left(&mic.0).is_ok()
}

/// Computes the MIC of a join-request, rejoin-request or join-accept:
/// CMAC over MHDR || payload, truncated to four bytes.
pub(crate) fn calculate_mic(data: &[u8], key: &AES128Key) -> MIC {
    let mut mac = new_cmac(key);
    mac.update(data);
    truncate(mac)
}

/// Verifies a join-flavour MIC in constant time.
pub(crate) fn verify_mic(data: &[u8], key: &AES128Key, mic: &MIC) -> bool {
    let mut mac = new_cmac(key);
    mac.update(data);
    mac.verify_truncated_left(&mic.0).is_ok()
}

/// Applies the FRMPayload cipher in place. Encryption and decryption are
/// the same operation: each byte is XORed with the AES encryption of the
/// counter block A_i, the final keystream block truncated to the buffer
/// length.
pub(crate) fn encrypt_frm_payload(
    buf: &mut [u8],
    key: &AES128Key,
    fcnt: u32,
    direction: Direction,
    dev_addr: &DevAddr,
) {
    let aes = new_aes(key);
    let mut a = generate_helper_block(0x01, direction, dev_addr, fcnt);

    let mut s = [0u8; 16];
    let mut ctr: u8 = 1;
    for i in 0..buf.len() {
        let j = i & 0x0f;
        if j == 0 {
            a[15] = ctr;
            ctr += 1;
            s.copy_from_slice(&a);
            aes.encrypt_block(GenericArray::from_mut_slice(&mut s));
        }
        buf[i] ^= s[j];
    }
}

/// AES-encrypts a single block with the given key, as used by the
/// session-key derivation.
pub(crate) fn aes_encrypt_block(block: &[u8; 16], key: &AES128Key) -> AES128Key {
    let aes = new_aes(key);
    let mut out = *block;
    aes.encrypt_block(GenericArray::from_mut_slice(&mut out));
    AES128Key(out)
}

/// Server-side join-accept encryption: the device only implements
/// AES-encrypt, so the server runs AES-**decrypt** over payload || MIC.
pub(crate) fn encrypt_join_accept(buf: &mut [u8], key: &AES128Key) -> Result<(), Error> {
    if buf.len() % 16 != 0 {
        return Err(Error::NotBlockAligned);
    }
    let aes = new_aes(key);
    for block in buf.chunks_exact_mut(16) {
        aes.decrypt_block(GenericArray::from_mut_slice(block));
    }
    Ok(())
}

/// Device-side join-accept decryption: AES-encrypt of the received blocks.
pub(crate) fn decrypt_join_accept(buf: &mut [u8], key: &AES128Key) -> Result<(), Error> {
    if buf.len() % 16 != 0 {
        return Err(Error::NotBlockAligned);
    }
    let aes = new_aes(key);
    for block in buf.chunks_exact_mut(16) {
        aes.encrypt_block(GenericArray::from_mut_slice(block));
    }
    Ok(())
}
