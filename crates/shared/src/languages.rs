//! Language catalog offered by the dubbing service.

use crate::domain::LanguageSide;

pub const DEFAULT_SOURCE_LANGUAGE: &str = "English - US";
pub const DEFAULT_TARGET_LANGUAGE: &str = "Spanish - Spain";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub locale: &'static str,
    pub label: &'static str,
}

const fn lang(locale: &'static str, label: &'static str) -> Language {
    Language { locale, label }
}

pub const SOURCE_LANGUAGES: &[Language] = &[
    lang("en_US", "English - US"),
    lang("en_UK", "English - UK"),
    lang("en_IN", "English - India"),
    lang("en_SCOTT", "English - Scottish"),
    lang("en_AU", "English - Australia"),
    lang("fr_FR", "French - France"),
    lang("de_DE", "German"),
    lang("es_ES", "Spanish - Spain"),
    lang("es_MX", "Spanish - Mexico"),
    lang("it_IT", "Italian"),
    lang("pt_BR", "Portuguese - Brazil"),
    lang("pl_PL", "Polish"),
    lang("hi_IN", "Hindi"),
    lang("ko_KR", "Korean"),
    lang("ja_JP", "Japanese"),
    lang("zh_CN", "Chinese - Mandarin"),
    lang("nl_NL", "Dutch"),
    lang("fi_FI", "Finnish"),
    lang("ru_RU", "Russian"),
    lang("tr_TR", "Turkish"),
    lang("uk_UA", "Ukrainian"),
];

pub const TARGET_LANGUAGES: &[Language] = &[
    lang("en_US", "English - US"),
    lang("en_UK", "English - UK"),
    lang("en_IN", "English - India"),
    lang("en_SCOTT", "English - Scottish"),
    lang("en_AU", "English - Australia"),
    lang("fr_FR", "French - France"),
    lang("de_DE", "German"),
    lang("es_ES", "Spanish - Spain"),
    lang("es_MX", "Spanish - Mexico"),
    lang("it_IT", "Italian"),
    lang("pt_BR", "Portuguese - Brazil"),
    lang("pl_PL", "Polish"),
    lang("hi_IN", "Hindi"),
    lang("ko_KR", "Korean"),
    lang("ta_IN", "Tamil"),
    lang("bn_IN", "Bengali"),
    lang("ja_JP", "Japanese"),
    lang("zh_CN", "Chinese - Mandarin"),
    lang("nl_NL", "Dutch"),
    lang("fi_FI", "Finnish"),
    lang("ru_RU", "Russian"),
    lang("tr_TR", "Turkish"),
    lang("da_DK", "Danish"),
    lang("id_ID", "Indonesian"),
    lang("ro_RO", "Romanian"),
    lang("nb_NO", "Norwegian"),
    lang("hr_HR", "Croatian"),
    lang("el_GR", "Greek"),
    lang("sk_SK", "Slovak"),
];

pub fn languages_for(side: LanguageSide) -> &'static [Language] {
    match side {
        LanguageSide::Source => SOURCE_LANGUAGES,
        LanguageSide::Target => TARGET_LANGUAGES,
    }
}

pub fn find_language(side: LanguageSide, label: &str) -> Option<&'static Language> {
    languages_for(side).iter().find(|l| l.label == label)
}

pub fn locale_for(side: LanguageSide, label: &str) -> Option<&'static str> {
    find_language(side, label).map(|l| l.locale)
}

/// First entry of `side`'s list whose label differs from `avoid`.
pub fn first_distinct(side: LanguageSide, avoid: &str) -> Option<&'static Language> {
    languages_for(side).iter().find(|l| l.label != avoid)
}
