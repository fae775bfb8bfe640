/// Initial prompt seeding the decoder with the marker phrases, so it
/// recognizes them reliably. Empty for languages without a prompt.
pub fn initial_prompt(language: &str) -> &'static str {
    match language {
        "en" => concat!(
            "Whisper, Ok. ",
            "A pertinent sentence for your purpose in your language. ",
            "Ok, Whisper. Whisper, Ok. Ok, Whisper. Whisper, Ok. ",
            "Please find here, an unlikely ordinary sentence. ",
            "This is to avoid a repetition to be deleted. ",
            "Ok, Whisper. ",
        ),
        "fr" => concat!(
            "Whisper, Ok. ",
            "Une phrase pertinente pour votre propos dans votre langue. ",
            "Ok, Whisper. Whisper, Ok. Ok, Whisper. Whisper, Ok. ",
            "Merci de trouver ci-joint, une phrase ordinaire improbable. ",
            "Pour éviter une répétition à être supprimée. ",
            "Ok, Whisper. ",
        ),
        "uk" => concat!(
            "Whisper, Ok. ",
            "Доречне речення вашою мовою для вашої мети. ",
            "Ok, Whisper. Whisper, Ok. Ok, Whisper. Whisper, Ok. ",
            "Будь ласка, знайдіть тут навряд чи звичайне речення. ",
            "Це зроблено для того, щоб уникнути повторення, яке потрібно видалити. ",
            "Ok, Whisper. ",
        ),
        "hi" => concat!(
            "विस्पर, ओके. ",
            "आपकी भाषा में आपके उद्देश्य के लिए एक प्रासंगिक वाक्य। ",
            "ओके, विस्पर. विस्पर, ओके. ओके, विस्पर. विस्पर, ओके. ",
            "कृपया यहां खोजें, एक असंभावित सामान्य वाक्य। ",
            "यह हटाए जाने की पुनरावृत्ति से बचने के लिए है। ",
            "ओके, विस्पर. ",
        ),
        _ => "",
    }
}

/// Prompt for a request: an explicit prompt wins, music gets none.
pub fn prompt_for(language: &str, explicit: Option<&str>, is_music: bool) -> Option<String> {
    let prompt = match explicit {
        Some(p) => p,
        None if is_music => "",
        None => initial_prompt(language),
    };
    (!prompt.is_empty()).then(|| prompt.to_string())
}
