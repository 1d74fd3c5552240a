use serde_json::json;

use super::*;

#[test]
fn every_introduction_dialect_yields_the_same_text() {
    let direct = json!({"content": "欢迎使用"});
    let legacy = json!({"success": true, "introduction": "欢迎使用"});
    let raw = json!("欢迎使用");

    for payload in [direct, legacy, raw] {
        assert_eq!(text(&payload, &INTRODUCTION).as_deref(), Some("欢迎使用"));
    }
}

#[test]
fn legacy_field_needs_a_truthy_success_flag() {
    let no_flag = json!({"introduction": "欢迎"});
    let false_flag = json!({"success": false, "introduction": "欢迎"});

    // Without the envelope the legacy field is invisible, so both fall
    // through to the generic serialization.
    assert_eq!(
        text(&no_flag, &INTRODUCTION),
        Some(no_flag.to_string())
    );
    assert_eq!(
        text(&false_flag, &INTRODUCTION),
        Some(false_flag.to_string())
    );
}

#[test]
fn empty_direct_field_does_not_win() {
    let payload = json!({"content": "", "text": "备用内容"});
    assert_eq!(text(&payload, &INTRODUCTION).as_deref(), Some("备用内容"));
}

#[test]
fn unrecognized_object_serializes_as_last_resort() {
    let payload = json!({"version": 3});
    assert_eq!(text(&payload, &ANALYSIS), Some(payload.to_string()));
}

#[test]
fn scalar_payloads_yield_nothing() {
    assert_eq!(text(&json!(null), &ANALYSIS), None);
    assert_eq!(text(&json!(42), &ANALYSIS), None);
    assert_eq!(text(&json!(true), &ANALYSIS), None);
}

#[test]
fn items_accepts_bare_array_and_items_field() {
    let bare = json!([{"id": 1}, {"id": 2}]);
    let wrapped = json!({"items": [{"id": 1}, {"id": 2}]});

    assert_eq!(items(&bare).map(|v| v.len()), Some(2));
    assert_eq!(items(&wrapped), items(&bare));
}

#[test]
fn items_falls_back_to_first_array_valued_key() {
    let payload = json!({"count": 1, "strategies": [{"id": 9}]});
    let found = items(&payload).expect("array key");
    assert_eq!(found[0]["id"], 9);
}

#[test]
fn items_rejects_arrayless_payloads() {
    assert_eq!(items(&json!({"count": 3})), None);
    assert_eq!(items(&json!("not a list")), None);
}

#[test]
fn record_requires_a_truthy_marker() {
    let exam = json!({"exam_id": 2, "questions": []});
    assert_eq!(record(&exam, EXAM_MARKERS), Some(exam.clone()));

    let zeroed = json!({"exam_id": 0, "content": ""});
    assert_eq!(record(&zeroed, EXAM_MARKERS), None);
    assert_eq!(record(&json!({"detail": "missing"}), EXAM_MARKERS), None);
}

#[test]
fn user_record_prefers_the_user_field() {
    let enveloped = json!({"success": true, "user": {"name": "小明"}});
    assert_eq!(user_record(&enveloped), Some(json!({"name": "小明"})));

    let bare = json!({"name": "小明", "grade": "大二"});
    assert_eq!(user_record(&bare), Some(bare.clone()));

    assert_eq!(user_record(&json!({"error": "用户不存在"})), None);
}

#[test]
fn explicit_success_boolean_decides_the_outcome() {
    assert_eq!(submit_outcome(&json!({"success": true})), SubmitOutcome::Accepted);
    assert_eq!(
        submit_outcome(&json!({"success": false, "error": "名字重复"})),
        SubmitOutcome::Rejected("名字重复".to_string())
    );
}

#[test]
fn success_marker_in_message_counts_as_accepted() {
    assert_eq!(
        submit_outcome(&json!({"message": "提交成功"})),
        SubmitOutcome::Accepted
    );
}

#[test]
fn error_field_rejects_with_its_text() {
    assert_eq!(
        submit_outcome(&json!({"error": "保存失败"})),
        SubmitOutcome::Rejected("保存失败".to_string())
    );
}

#[test]
fn silent_payloads_are_ambiguous_and_count_as_success() {
    for payload in [json!({}), json!({"id": 7}), json!(null), json!("ok")] {
        let outcome = submit_outcome(&payload);
        assert_eq!(outcome, SubmitOutcome::Ambiguous);
        assert!(outcome.is_success());
    }
}

#[test]
fn fallback_guide_covers_the_advertised_sections() {
    assert!(FALLBACK_STRATEGY_GUIDE.starts_with("# 阅读策略建议"));
    for heading in ["扫读技巧", "细读技巧", "SQ3R"] {
        assert!(FALLBACK_STRATEGY_GUIDE.contains(heading));
    }
}
