use crate::error::FormatError;
use crate::scene::{DialogLine, Scene};
use serde_json::{Map, Value};

/// 校验 JSON 是否符合 Scene 结构，成功时返回类型化的 Scene
///
/// `require_aligned` 为真时要求 translation 与 dialog 条数一致。
pub fn validate_scene_format(value: &Value, require_aligned: bool) -> Result<Scene, FormatError> {
    let obj = value.as_object().ok_or(FormatError::NotAnObject)?;

    let title = string_field(obj, "title")?;
    let description = string_field(obj, "description")?;

    let dialog = obj
        .get("dialog")
        .ok_or(FormatError::MissingField("dialog"))?
        .as_array()
        .ok_or(FormatError::NotASequence("dialog"))?
        .iter()
        .enumerate()
        .map(|(index, entry)| dialog_line(index, entry))
        .collect::<Result<Vec<_>, _>>()?;

    let translation = obj
        .get("translation")
        .ok_or(FormatError::MissingField("translation"))?
        .as_array()
        .ok_or(FormatError::NotASequence("translation"))?
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            entry
                .as_str()
                .map(str::to_string)
                .ok_or(FormatError::TranslationNotAString(index))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if require_aligned && translation.len() != dialog.len() {
        return Err(FormatError::TranslationMismatch {
            dialog: dialog.len(),
            translation: translation.len(),
        });
    }

    // id 只是展示用，缺失或非法时归零
    let id = obj.get("id").and_then(Value::as_u64).unwrap_or(0);

    Ok(Scene {
        id,
        title,
        description,
        dialog,
        translation,
    })
}

fn string_field(obj: &Map<String, Value>, field: &'static str) -> Result<String, FormatError> {
    obj.get(field)
        .ok_or(FormatError::MissingField(field))?
        .as_str()
        .map(str::to_string)
        .ok_or(FormatError::NotAString(field))
}

fn dialog_line(index: usize, entry: &Value) -> Result<DialogLine, FormatError> {
    let non_empty = |field: &'static str| {
        entry
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or(FormatError::EmptyLineField { index, field })
    };

    Ok(DialogLine {
        speaker: non_empty("speaker")?,
        text: non_empty("text")?,
        pingyin: non_empty("pingyin")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> Value {
        json!({
            "title": "T",
            "description": "D",
            "dialog": [{ "speaker": "A", "text": "你好", "pingyin": "nǐ hǎo" }],
            "translation": ["A: Hello"]
        })
    }

    #[test]
    fn accepts_minimal_scene() {
        let scene = validate_scene_format(&minimal(), true).unwrap();
        assert_eq!(scene.title, "T");
        assert_eq!(scene.dialog.len(), 1);
        assert_eq!(scene.dialog[0].speaker, "A");
        assert_eq!(scene.translation, vec!["A: Hello".to_string()]);
    }

    #[test]
    fn rejects_missing_title() {
        let mut value = minimal();
        value.as_object_mut().unwrap().remove("title");
        assert_eq!(
            validate_scene_format(&value, true),
            Err(FormatError::MissingField("title"))
        );
    }

    #[test]
    fn rejects_non_string_description() {
        let mut value = minimal();
        value["description"] = json!(42);
        assert_eq!(
            validate_scene_format(&value, true),
            Err(FormatError::NotAString("description"))
        );
    }

    #[test]
    fn rejects_empty_speaker() {
        let mut value = minimal();
        value["dialog"][0]["speaker"] = json!("");
        assert_eq!(
            validate_scene_format(&value, true),
            Err(FormatError::EmptyLineField {
                index: 0,
                field: "speaker"
            })
        );
    }

    #[test]
    fn rejects_missing_pingyin() {
        let mut value = minimal();
        value["dialog"][0].as_object_mut().unwrap().remove("pingyin");
        assert!(matches!(
            validate_scene_format(&value, true),
            Err(FormatError::EmptyLineField { field: "pingyin", .. })
        ));
    }

    #[test]
    fn rejects_translation_that_is_not_an_array() {
        let mut value = minimal();
        value["translation"] = json!("A: Hello");
        assert_eq!(
            validate_scene_format(&value, true),
            Err(FormatError::NotASequence("translation"))
        );
    }

    #[test]
    fn rejects_non_string_fields_instead_of_stringifying() {
        let mut value = minimal();
        value["translation"] = json!([42]);
        assert_eq!(
            validate_scene_format(&value, true),
            Err(FormatError::TranslationNotAString(0))
        );

        let mut value = minimal();
        value["dialog"][0]["speaker"] = json!(1);
        assert_eq!(
            validate_scene_format(&value, true),
            Err(FormatError::EmptyLineField {
                index: 0,
                field: "speaker"
            })
        );
    }

    #[test]
    fn rejects_missing_dialog() {
        let mut value = minimal();
        value.as_object_mut().unwrap().remove("dialog");
        assert_eq!(
            validate_scene_format(&value, true),
            Err(FormatError::MissingField("dialog"))
        );
    }

    #[test]
    fn alignment_is_enforced_only_when_requested() {
        let mut value = minimal();
        value["translation"] = json!([]);

        assert_eq!(
            validate_scene_format(&value, true),
            Err(FormatError::TranslationMismatch {
                dialog: 1,
                translation: 0
            })
        );
        assert!(validate_scene_format(&value, false).is_ok());
    }

    #[test]
    fn rejects_non_object() {
        assert_eq!(
            validate_scene_format(&json!([1, 2]), true),
            Err(FormatError::NotAnObject)
        );
    }

    #[test]
    fn keeps_numeric_id() {
        let mut value = minimal();
        value["id"] = json!(7);
        assert_eq!(validate_scene_format(&value, true).unwrap().id, 7);
    }
}
