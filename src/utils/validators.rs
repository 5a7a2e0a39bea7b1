// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::domain::models::job::{ScrapeMode, MAX_UPLOAD_IDENTIFIER_LEN};

// Bounded repetitions like `[\w-]{1,255}` expand past regex's default 10 MB
// compile budget, so give these patterns a larger size limit. This does not
// change which URLs match — only the compilation budget.
const URL_PATTERN_SIZE_LIMIT: usize = 64 * 1024 * 1024;

// Per-mode URL patterns, compiled once at first use.
static HOTEL_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"^https://www\.tripadvisor\.com/Hotel_Review-g\d{6,10}-d\d{1,10}-Reviews-[\w-]{1,255}\.html$")
        .size_limit(URL_PATTERN_SIZE_LIMIT)
        .build()
        .expect("invalid hotel URL pattern")
});

static RESTO_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"^https://www\.tripadvisor\.com/Restaurant_Review-g\d{6,10}-d\d{1,10}-Reviews-[\w-]{1,255}\.html$")
        .size_limit(URL_PATTERN_SIZE_LIMIT)
        .build()
        .expect("invalid restaurant URL pattern")
});

static AIRLINE_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"^https://www\.tripadvisor\.com/Airline_Review-d\d{6,10}-Reviews-[\w-]{1,255}\.html$")
        .size_limit(URL_PATTERN_SIZE_LIMIT)
        .build()
        .expect("invalid airline URL pattern")
});

/// 校验目标URL是否符合指定抓取模式的格式
///
/// # 参数
///
/// * `url` - 目标URL字符串
/// * `mode` - 抓取模式
///
/// # 返回值
///
/// URL与该模式注册的正则匹配时返回true，否则返回false
pub fn is_valid_target_url(url: &str, mode: ScrapeMode) -> bool {
    match mode {
        ScrapeMode::Hotel => HOTEL_URL_PATTERN.is_match(url),
        ScrapeMode::Resto => RESTO_URL_PATTERN.is_match(url),
        ScrapeMode::Airline => AIRLINE_URL_PATTERN.is_match(url),
    }
}

/// 校验上传者标识
///
/// 非空且不超过20个字符时有效。
pub fn is_valid_upload_identifier(identifier: &str) -> bool {
    let len = identifier.chars().count();
    len > 0 && len <= MAX_UPLOAD_IDENTIFIER_LEN
}
