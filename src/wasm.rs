//! 浏览器端入口，输入输出都是字符串

use anyhow::Result;
use wasm_bindgen::prelude::*;

use crate::config::CONFIG;
use crate::models::catalog::InMemoryCatalog;
use crate::models::match_result::Identification;
use crate::my_utils::io::decode_base64_image;
use crate::recognition::engine::Engine;

/// base64 图片 + JSON 指纹库，返回识别结果的 JSON；出错时返回 {"error": "..."}
#[wasm_bindgen]
pub fn identify_base64(image_base64: String, catalog_json: String) -> String {
    match run(&image_base64, &catalog_json) {
        Ok(identification) => match serde_json::to_string(&identification) {
            Ok(json) => json,
            Err(e) => error_json(&e.to_string()),
        },
        Err(e) => error_json(&format!("{e:#}")),
    }
}

fn run(image_base64: &str, catalog_json: &str) -> Result<Identification> {
    let catalog = InMemoryCatalog::from_json_str(catalog_json)?;
    let image = decode_base64_image(image_base64)?;
    // wasm 里没有线程池
    let mut config = CONFIG.clone();
    config.matching.parallel = false;
    let identification = Engine::new(config).identify_detailed(&image, &catalog)?;
    Ok(identification)
}

fn error_json(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}
