//! UI string table for the thirteen supported locales.
//!
//! English is complete. Other locales carry what has been translated so far
//! and fall back to English per key.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::capabilities::{StorageKey, TypedSlot};

/// Written as a JSON string (`"hi"`). Read back through
/// [`Language::from_stored`], which also takes bare codes.
pub const LANGUAGE_SLOT: TypedSlot<Language> = TypedSlot::new(StorageKey::Language);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Language {
    #[default]
    En,
    Hi,
    Bn,
    Mr,
    Te,
    Ta,
    Gu,
    Ur,
    Kn,
    Or,
    Ml,
    Pa,
    As,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown language code '{0}'")]
pub struct UnknownLanguage(pub String);

impl Language {
    pub const ALL: [Self; 13] = [
        Self::En,
        Self::Hi,
        Self::Bn,
        Self::Mr,
        Self::Te,
        Self::Ta,
        Self::Gu,
        Self::Ur,
        Self::Kn,
        Self::Or,
        Self::Ml,
        Self::Pa,
        Self::As,
    ];

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Hi => "hi",
            Self::Bn => "bn",
            Self::Mr => "mr",
            Self::Te => "te",
            Self::Ta => "ta",
            Self::Gu => "gu",
            Self::Ur => "ur",
            Self::Kn => "kn",
            Self::Or => "or",
            Self::Ml => "ml",
            Self::Pa => "pa",
            Self::As => "as",
        }
    }

    /// Native name with the English name in parentheses, as shown in the
    /// language picker and named in the diagnosis instruction.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Hi => "हिंदी (Hindi)",
            Self::Bn => "বাংলা (Bengali)",
            Self::Mr => "मराठी (Marathi)",
            Self::Te => "తెలుగు (Telugu)",
            Self::Ta => "தமிழ் (Tamil)",
            Self::Gu => "ગુજરાતી (Gujarati)",
            Self::Ur => "اردو (Urdu)",
            Self::Kn => "ಕನ್ನಡ (Kannada)",
            Self::Or => "ଓଡ଼ିଆ (Odia)",
            Self::Ml => "മലയാളം (Malayalam)",
            Self::Pa => "ਪੰਜਾਬੀ (Punjabi)",
            Self::As => "অসমীয়া (Assamese)",
        }
    }

    #[must_use]
    pub fn short_label(self) -> &'static str {
        let name = self.display_name();
        name.split_whitespace().next().unwrap_or(name)
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|language| language.code().eq_ignore_ascii_case(code))
    }

    /// Reads the persisted language. Accepts a JSON string (`"hi"`) or the
    /// bare code older builds wrote (`hi`, `HI`).
    #[must_use]
    pub fn from_stored(data: &[u8]) -> Option<Self> {
        if let Ok(language) = serde_json::from_slice::<Self>(data) {
            return Some(language);
        }
        std::str::from_utf8(data).ok().and_then(Self::from_code)
    }

    #[must_use]
    pub fn is_rtl(self) -> bool {
        self == Self::Ur
    }
}

impl TryFrom<String> for Language {
    type Error = UnknownLanguage;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Self::from_code(&code).ok_or(UnknownLanguage(code))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Looks up `key` for `language`. Missing translations fall back to English;
/// unknown keys come back unchanged.
#[must_use]
pub fn translate(key: &str, language: Language) -> &str {
    let Some(entry) = TABLE.iter().find(|entry| entry.key == key) else {
        return key;
    };
    let localized = entry
        .translations
        .iter()
        .find(|(lang, text)| *lang == language && !text.is_empty())
        .map(|(_, text)| *text);
    match localized {
        Some(text) => text,
        None if !entry.en.is_empty() => entry.en,
        None => key,
    }
}

#[cfg(test)]
pub(crate) fn has_key(key: &str) -> bool {
    TABLE.iter().any(|entry| entry.key == key)
}

struct Entry {
    key: &'static str,
    en: &'static str,
    translations: &'static [(Language, &'static str)],
}

macro_rules! entry {
    ($key:literal, $en:literal $(, $lang:ident => $text:literal)* $(,)?) => {
        Entry {
            key: $key,
            en: $en,
            translations: &[$((Language::$lang, $text)),*],
        }
    };
}

static TABLE: &[Entry] = &[
    // shell
    entry!("app_title", "AgroAI"),
    entry!("smart_farming", "Smart Farming Assistant", Hi => "स्मार्ट खेती सहायक"),
    entry!("language_label", "Language", Hi => "भाषा", Bn => "ভাষা", Mr => "भाषा", Pa => "ਭਾਸ਼ਾ"),
    entry!("logout", "Logout", Hi => "लॉग आउट"),
    entry!(
        "nav_home", "Home",
        Hi => "होम", Bn => "হোম", Mr => "होम", Te => "హోమ్", Ta => "முகப்பு",
        Gu => "હોમ", Kn => "ಮುಖಪುಟ", Ml => "ഹോം", Pa => "ਹੋਮ",
    ),
    entry!(
        "nav_doctor", "Doctor",
        Hi => "डॉक्टर", Bn => "ডাক্তার", Mr => "डॉक्टर", Te => "డాక్టర్", Ta => "மருத்துவர்",
        Gu => "ડૉક્ટર", Kn => "ವೈದ್ಯ", Ml => "ഡോക്ടർ", Pa => "ਡਾਕਟਰ",
    ),
    entry!(
        "nav_notes", "Notes",
        Hi => "नोट्स", Bn => "নোট", Mr => "नोंदी", Te => "గమనికలు", Ta => "குறிப்புகள்",
        Gu => "નોંધો", Kn => "ಟಿಪ್ಪಣಿಗಳು", Ml => "കുറിപ്പുകൾ", Pa => "ਨੋਟਸ",
    ),
    entry!(
        "nav_expert", "Expert",
        Hi => "विशेषज्ञ", Bn => "বিশেষজ্ঞ", Mr => "तज्ज्ञ", Te => "నిపుణుడు", Ta => "நிபுணர்",
        Gu => "નિષ્ણાત", Kn => "ತಜ್ಞ", Ml => "വിദഗ്ധൻ", Pa => "ਮਾਹਰ",
    ),
    // auth
    entry!("login_welcome", "Welcome back, farmer", Hi => "फिर से स्वागत है, किसान"),
    entry!("create_account", "Create your account", Hi => "अपना खाता बनाएं"),
    entry!("full_name", "Full Name", Hi => "पूरा नाम"),
    entry!("email", "Email", Hi => "ईमेल"),
    entry!("password", "Password", Hi => "पासवर्ड"),
    entry!("location", "Location (Village/District)", Hi => "स्थान (गाँव/ज़िला)"),
    entry!("remember_me", "Remember me", Hi => "मुझे याद रखें"),
    entry!("login_to_farm", "Login to Farm", Hi => "खेत में लॉगिन करें"),
    entry!("start_farming", "Start Farming", Hi => "खेती शुरू करें"),
    entry!("new_to_app", "New to AgroAI? Create an account", Hi => "एग्रोएआई पर नए हैं? खाता बनाएं"),
    entry!("already_have_account", "Already have an account? Login", Hi => "पहले से खाता है? लॉगिन करें"),
    entry!("signing_in", "Signing in...", Hi => "लॉगिन हो रहा है..."),
    // dashboard
    entry!(
        "hello", "Hello",
        Hi => "नमस्ते", Bn => "নমস্কার", Mr => "नमस्कार", Te => "నమస్కారం", Ta => "வணக்கம்",
        Gu => "નમસ્તે", Ur => "السلام علیکم", Kn => "ನಮಸ್ಕಾರ", Or => "ନମସ୍କାର",
        Ml => "നമസ്കാരം", Pa => "ਸਤ ਸ੍ਰੀ ਅਕਾਲ", As => "নমস্কাৰ",
    ),
    entry!("weather_current", "Current Weather", Hi => "वर्तमान मौसम"),
    entry!("humidity", "Humidity", Hi => "नमी"),
    entry!("wind", "Wind", Hi => "हवा"),
    entry!("scan_crop", "Scan Crop", Hi => "फसल स्कैन करें"),
    entry!("field_notes", "Field Notes", Hi => "खेत के नोट्स"),
    entry!("recent_alerts", "Recent Alerts", Hi => "हाल की चेतावनियाँ"),
    entry!("alert_blight_title", "Potential Potato Blight", Hi => "आलू झुलसा रोग की संभावना"),
    entry!("alert_blight_body", "High humidity forecasted next 48h.", Hi => "अगले 48 घंटों में अधिक नमी का अनुमान।"),
    // doctor
    entry!("doctor_title", "Crop Doctor", Hi => "फसल डॉक्टर"),
    entry!("doctor_desc", "Take a photo of the affected plant to identify diseases.", Hi => "रोग पहचानने के लिए प्रभावित पौधे की फोटो लें।"),
    entry!("take_photo", "Take Photo", Hi => "फोटो लें"),
    entry!("upload_photo", "Upload from Gallery", Hi => "गैलरी से अपलोड करें"),
    entry!("analyze_crop", "Analyze Crop", Hi => "फसल की जाँच करें"),
    entry!("analyzing", "Analyzing...", Hi => "विश्लेषण हो रहा है..."),
    entry!("healthy", "Healthy", Hi => "स्वस्थ"),
    entry!("disease_detected", "Disease Detected", Hi => "रोग पाया गया"),
    entry!("confidence", "Confidence", Hi => "विश्वास स्तर"),
    entry!("natural_treatment", "Natural Treatment", Hi => "प्राकृतिक उपचार"),
    entry!("chemical_treatment", "Chemical Treatment", Hi => "रासायनिक उपचार"),
    entry!("scan_another", "Scan Another", Hi => "दूसरी फसल स्कैन करें"),
    entry!("analysis_failed", "Analysis failed. Please try again.", Hi => "विश्लेषण विफल रहा। कृपया फिर से प्रयास करें।"),
    // notes
    entry!("new_btn", "New", Hi => "नया"),
    entry!("search_notes", "Search notes...", Hi => "नोट्स खोजें..."),
    entry!("edit_note", "Edit Note", Hi => "नोट संपादित करें"),
    entry!("new_note", "New Note", Hi => "नया नोट"),
    entry!("title_label", "Title", Hi => "शीर्षक"),
    entry!("category_label", "Category", Hi => "श्रेणी"),
    entry!("cat_general", "General", Hi => "सामान्य"),
    entry!("cat_planting", "Planting", Hi => "बुवाई"),
    entry!("cat_irrigation", "Irrigation", Hi => "सिंचाई"),
    entry!("cat_harvest", "Harvest", Hi => "कटाई"),
    entry!("cat_issue", "Issue", Hi => "समस्या"),
    entry!("observations_label", "Observations", Hi => "अवलोकन"),
    entry!("cancel", "Cancel", Hi => "रद्द करें"),
    entry!("update_note", "Update Note", Hi => "नोट अपडेट करें"),
    entry!("save_note", "Save Note", Hi => "नोट सहेजें"),
    entry!("delete", "Delete", Hi => "हटाएं"),
    entry!("no_notes_found", "No notes found", Hi => "कोई नोट नहीं मिला"),
    entry!("delete_confirm", "Are you sure you want to delete this note?", Hi => "क्या आप वाकई इस नोट को हटाना चाहते हैं?"),
    // expert
    entry!("ask_expert", "Ask an Expert", Hi => "विशेषज्ञ से पूछें"),
    entry!("expert_desc", "Get advice from agricultural specialists.", Hi => "कृषि विशेषज्ञों से सलाह लें।"),
    entry!("request_sent", "Request sent! An expert will contact you soon.", Hi => "अनुरोध भेजा गया! विशेषज्ञ जल्द ही आपसे संपर्क करेंगे।"),
    entry!("subject_label", "Subject", Hi => "विषय"),
    entry!("description_label", "Description", Hi => "विवरण"),
    entry!("submit_request", "Submit Request", Hi => "अनुरोध भेजें"),
    entry!("subject_disease", "Disease Identification Help", Hi => "रोग पहचान में मदद"),
    entry!("subject_fertilizer", "Fertilizer Recommendation", Hi => "उर्वरक सुझाव"),
    entry!("subject_irrigation", "Irrigation Advice", Hi => "सिंचाई सलाह"),
    entry!("subject_general", "General Inquiry", Hi => "सामान्य पूछताछ"),
    // errors
    entry!("err_email_required", "Please enter your email.", Hi => "कृपया अपना ईमेल दर्ज करें।"),
    entry!("err_password_required", "Please enter your password.", Hi => "कृपया अपना पासवर्ड दर्ज करें।"),
    entry!("err_name_required", "Please enter your name.", Hi => "कृपया अपना नाम दर्ज करें।"),
    entry!("err_title_required", "Please enter a title.", Hi => "कृपया शीर्षक दर्ज करें।"),
    entry!("err_description_required", "Please describe your problem.", Hi => "कृपया अपनी समस्या का वर्णन करें।"),
    entry!("err_network", "Unable to connect. Please check your internet connection.", Hi => "कनेक्ट नहीं हो सका। कृपया अपना इंटरनेट कनेक्शन जाँचें।"),
    entry!("err_timeout", "The request timed out. Please try again."),
    entry!("err_storage", "Unable to save data on this device."),
    entry!("err_image_invalid", "This image could not be read. Please try a different photo."),
    entry!("err_image_too_large", "The image is too large. Please choose a smaller photo."),
    entry!("err_camera", "The camera is not available right now."),
    entry!("err_camera_permission", "Camera access is required. Please enable it in Settings."),
    entry!("err_login_failed", "Login failed. Please try again."),
    entry!("err_config", "The crop doctor is not configured on this device."),
    entry!("err_unexpected", "Something went wrong. Please try again.", Hi => "कुछ गलत हो गया। कृपया फिर से प्रयास करें।"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_key_is_returned_verbatim() {
        assert_eq!(translate("no_such_key", Language::Hi), "no_such_key");
    }

    #[test]
    fn missing_translation_falls_back_to_english() {
        assert_eq!(translate("err_storage", Language::Ta), "Unable to save data on this device.");
        assert_eq!(translate("app_title", Language::Hi), "AgroAI");
    }

    #[test]
    fn hindi_entries_resolve() {
        assert_eq!(translate("hello", Language::Hi), "नमस्ते");
        assert_eq!(translate("nav_notes", Language::Hi), "नोट्स");
    }

    #[test]
    fn every_language_has_a_greeting() {
        for language in Language::ALL {
            let greeting = translate("hello", language);
            if language != Language::En {
                assert_ne!(greeting, "Hello", "{language} greeting missing");
            }
        }
    }

    #[test]
    fn keys_are_unique() {
        let mut keys: Vec<_> = TABLE.iter().map(|entry| entry.key).collect();
        keys.sort_unstable();
        let before = keys.len();
        keys.dedup();
        assert_eq!(before, keys.len());
    }

    #[test]
    fn codes_round_trip() {
        for language in Language::ALL {
            assert_eq!(Language::from_code(language.code()), Some(language));
            let json = serde_json::to_string(&language).unwrap();
            assert_eq!(json, format!("\"{}\"", language.code()));
            assert_eq!(serde_json::from_str::<Language>(&json).unwrap(), language);
        }
    }

    #[test]
    fn stored_value_formats() {
        assert_eq!(Language::from_stored(br#""hi""#), Some(Language::Hi));
        assert_eq!(Language::from_stored(b"HI"), Some(Language::Hi));
        assert_eq!(Language::from_stored(b" ta "), Some(Language::Ta));
        assert_eq!(Language::from_stored(b"klingon"), None);
        assert_eq!(Language::from_stored(br#""xx""#), None);
    }

    #[test]
    fn short_label_is_first_word() {
        assert_eq!(Language::En.short_label(), "English");
        assert_eq!(Language::Hi.short_label(), "हिंदी");
        assert_eq!(Language::Or.short_label(), "ଓଡ଼ିଆ");
    }

    #[test]
    fn default_is_english() {
        assert_eq!(Language::default(), Language::En);
        assert!(Language::Ur.is_rtl());
        assert!(!Language::Hi.is_rtl());
    }
}
