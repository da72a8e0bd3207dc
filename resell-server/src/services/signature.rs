//! 响应签名
//!
//! `X-Signature` = hex(HMAC-SHA256(seed, body))。客户端用同一个种子校验
//! 订单响应未被篡改；幂等重放返回相同的字节，因此签名也相同。

use hmac::{Hmac, Mac};
use sha2::Sha256;

pub const SIGNATURE_HEADER: &str = "x-signature";

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of `body`
pub fn sign_body(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// 客户端工具: 校验收到的 `X-Signature` (常数时间比较)
///
/// 服务端只负责签名，不会调用它；Rust 客户端和集成测试用它验证订单响应。
pub fn verify_body(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
