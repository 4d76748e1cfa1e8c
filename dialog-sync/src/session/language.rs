//! Language codes sent to the remote service.

use crate::config::HostContext;

/// Site languages the remote player supports.
pub const SITE_LANGUAGES: [&str; 13] = [
    "en", "es", "ja", "ko", "pt", "ru", "tr", "vi", "zh", "he", "ar", "fr", "th",
];

const FALLBACK: &str = "en";

fn prefix(lang: &str) -> Option<String> {
    let code: String = lang.trim().chars().take(2).collect::<String>().to_ascii_lowercase();
    (code.chars().count() == 2).then_some(code)
}

/// Two-letter site language of the current page, `en` when unsupported.
pub fn site_language(current_language: &str) -> String {
    prefix(current_language)
        .filter(|code| SITE_LANGUAGES.contains(&code.as_str()))
        .unwrap_or_else(|| FALLBACK.to_string())
}

/// Two-letter native language of the user: the user's preference, then the
/// site default, then `en`.
pub fn native_language(ctx: &HostContext) -> String {
    ctx.user_language
        .as_deref()
        .and_then(prefix)
        .or_else(|| ctx.site_language.as_deref().and_then(prefix))
        .unwrap_or_else(|| FALLBACK.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_language() {
        assert_eq!(site_language("ja"), "ja");
        assert_eq!(site_language("pt_br"), "pt");
        assert_eq!(site_language("FR_ca"), "fr");
        assert_eq!(site_language("de"), "en");
        assert_eq!(site_language(""), "en");
    }

    #[test]
    fn test_native_language_fallbacks() {
        let ctx = HostContext::new(1, 1);
        assert_eq!(native_language(&ctx), "en");

        let ctx = ctx.with_languages("en", None, Some("de_du".to_string()));
        assert_eq!(native_language(&ctx), "de");

        let ctx = ctx.with_languages("en", Some("zh_cn".to_string()), Some("de".to_string()));
        assert_eq!(native_language(&ctx), "zh");
    }
}
