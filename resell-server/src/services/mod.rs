//! HTTP 装配: 路由、中间件、响应签名

pub mod app;
pub mod signature;
