use super::*;

#[test]
fn append_keeps_arrival_order() {
    let mut session = Session::new();

    let appended = session.append(TranscriptEntry::new(Speaker::User, "What is diabetes?"));
    assert_eq!(appended.text, "What is diabetes?");

    session.append(TranscriptEntry::new(Speaker::ExpertDataset, "A metabolic disease."));
    session.append(TranscriptEntry::new(Speaker::Model, "Diabetes "));
    session.append(TranscriptEntry::new(Speaker::Model, "affects blood sugar."));

    let speakers: Vec<Speaker> = session.transcript().iter().map(|e| e.speaker).collect();
    assert_eq!(
        speakers,
        vec![
            Speaker::User,
            Speaker::ExpertDataset,
            Speaker::Model,
            Speaker::Model
        ]
    );

    let model_text: String = session
        .entries_by(Speaker::Model)
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(model_text, "Diabetes affects blood sugar.");
}

#[test]
fn transcript_and_conversation_are_independent() {
    let mut session = Session::new();
    session.append(TranscriptEntry::new(Speaker::User, "hello"));
    assert!(session.conversation().is_empty());

    session.record_exchange("hello", "hi there");
    assert_eq!(session.conversation().len(), 2);
    assert_eq!(session.transcript().len(), 1);
}

#[test]
fn speaker_labels() {
    assert_eq!(Speaker::User.to_string(), "You");
    assert_eq!(Speaker::ExpertDataset.to_string(), "Expert");
    assert_eq!(Speaker::Model.to_string(), "Bot");
    assert_eq!(Speaker::Notice.label(), "Notice");
}
