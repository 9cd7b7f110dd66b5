//! Sample manuscripts for testing and demonstration.
//!
//! Each sample exercises a different part of the layout: paragraph breaks,
//! line breaks, combined numerals, long digit runs and mixed scripts.

/// Opening of a short novel with a chapter heading and numerals.
pub fn novel_opening() -> &'static str {
    "第1章\n\n\
     吾輩は猫である。名前はまだ無い。\n\
     どこで生れたかとんと見当がつかぬ。\n\n\
     何でも薄暗いじめじめした所で、2、3度ニャーニャー泣いていた事だけは記憶している。\n\n\
     吾輩はここで始めて人間というものを見た。"
}

/// Dates and times: every number is one or two digits.
pub fn diary() -> &'static str {
    "5月3日（晴れ）\n\n\
     朝7時に起きて、10時から12時まで原稿を書いた。\n\
     午後は3時に散歩。\n\n\
     5月4日（雨）\n\n\
     一日中、家で本を読んだ。24ページしか進まなかった。"
}

/// Years, prices and phone numbers: long digit runs that stay plain.
pub fn long_numbers() -> &'static str {
    "西暦2024年、価格は12345円でした。\n\n\
     電話番号は0312345678です。第3版は99部だけ刷った。"
}

/// Latin text, for horizontal layouts and the built-in fonts.
pub fn latin() -> &'static str {
    "Chapter 1\n\n\
     It was a bright cold day in April, and the clocks were striking 13.\n\n\
     The hallway smelt of boiled cabbage and old rag mats."
}

/// Enough text for several pages in every page size.
pub fn multi_page() -> String {
    let paragraph = "吾輩は猫である。名前はまだ無い。どこで生れたかとんと見当がつかぬ。\
                     何でも薄暗いじめじめした所でニャーニャー泣いていた事だけは記憶している。";
    (1..=60)
        .map(|i| format!("{i}. {paragraph}"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Look a sample up by name.
pub fn by_name(name: &str) -> Option<String> {
    match name {
        "novel" => Some(novel_opening().to_string()),
        "diary" => Some(diary().to_string()),
        "numbers" => Some(long_numbers().to_string()),
        "latin" => Some(latin().to_string()),
        "multipage" => Some(multi_page()),
        _ => None,
    }
}

/// Names accepted by [`by_name`].
pub const NAMES: &[&str] = &["novel", "diary", "numbers", "latin", "multipage"];
