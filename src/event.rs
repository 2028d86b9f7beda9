//! Event Translator: maps a parsed GitLab webhook payload to an optional
//! Markdown chat message. Pure — no I/O happens here.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use crate::EventPolicy;
use crate::error::{BridgeError, Result};

/// The five event kinds the bridge knows how to report, as identified by the
/// payload's `object_kind` discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Push,
    Issue,
    TagPush,
    Note,
    MergeRequest,
}

impl EventKind {
    pub fn from_object_kind(kind: &str) -> Option<Self> {
        match kind {
            "push" => Some(Self::Push),
            "issue" => Some(Self::Issue),
            "tag_push" => Some(Self::TagPush),
            "note" => Some(Self::Note),
            "merge_request" => Some(Self::MergeRequest),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Repository {
    name: String,
    homepage: String,
}

#[derive(Debug, Deserialize)]
struct User {
    username: String,
}

#[derive(Debug, Deserialize)]
struct PushEvent {
    user_name: String,
    total_commits_count: u64,
    #[serde(rename = "ref")]
    git_ref: String,
    repository: Repository,
}

#[derive(Debug, Deserialize)]
struct TagPushEvent {
    user_name: String,
    #[serde(rename = "ref")]
    git_ref: String,
    repository: Repository,
}

#[derive(Debug, Deserialize)]
struct IssueAttributes {
    iid: u64,
    title: String,
    url: String,
    action: String,
    description: String,
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct IssueEvent {
    user: User,
    repository: Repository,
    object_attributes: IssueAttributes,
}

#[derive(Debug, Deserialize)]
struct TargetProject {
    name: String,
    web_url: String,
}

#[derive(Debug, Deserialize)]
struct MergeRequestAttributes {
    iid: u64,
    title: String,
    url: String,
    action: String,
    description: String,
    created_at: String,
    target: TargetProject,
}

#[derive(Debug, Deserialize)]
struct MergeRequestEvent {
    user: User,
    object_attributes: MergeRequestAttributes,
}

#[derive(Debug, Deserialize)]
struct NoteAttributes {
    noteable_type: String,
    note: String,
    url: String,
    created_at: String,
}

/// Id + title of the object a comment is attached to.
#[derive(Debug, Deserialize)]
struct NoteableRef {
    iid: u64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct NoteEvent {
    user: User,
    repository: Repository,
    object_attributes: NoteAttributes,
    merge_request: Option<NoteableRef>,
    snippet: Option<NoteableRef>,
    issue: Option<NoteableRef>,
    commit: Option<CommitRef>,
}

/// Translates an inbound event payload into a chat message.
///
/// Returns `Ok(None)` when there is nothing to report: the `object_kind` is
/// unrecognized, the kind is disabled in the policy, or an issue/merge-request
/// action other than open/reopen. A missing discriminator or a missing
/// kind-specific field is a schema violation, not a silent skip.
pub fn translate(payload: &Value, policy: &EventPolicy) -> Result<Option<String>> {
    let object_kind = payload
        .get("object_kind")
        .and_then(Value::as_str)
        .ok_or_else(|| BridgeError::SchemaViolation("object_kind".to_string()))?;

    let Some(kind) = EventKind::from_object_kind(object_kind) else {
        info!("Unrecognized object_kind '{}', nothing to report", object_kind);
        return Ok(None);
    };

    if !policy.is_enabled(kind) {
        info!("Event kind '{}' is disabled, nothing to report", object_kind);
        return Ok(None);
    }

    let text = match kind {
        EventKind::Push => Some(render_push(&parse(payload)?)),
        EventKind::TagPush => Some(render_tag_push(&parse(payload)?)),
        EventKind::Issue => render_issue(&parse(payload)?),
        EventKind::MergeRequest => render_merge_request(&parse(payload)?),
        EventKind::Note => Some(render_note(&parse(payload)?)?),
    };

    Ok(text)
}

fn parse<T: DeserializeOwned>(payload: &Value) -> Result<T> {
    serde_json::from_value(payload.clone())
        .map_err(|e| BridgeError::SchemaViolation(e.to_string()))
}

fn render_push(event: &PushEvent) -> String {
    format!(
        "{} pushed {} commit(s) into the `{}` branch for project [{}]({}).",
        event.user_name,
        event.total_commits_count,
        event.git_ref,
        event.repository.name,
        event.repository.homepage
    )
}

fn render_tag_push(event: &TagPushEvent) -> String {
    format!(
        "{} pushed tag `{}` to the project [{}]({}).",
        event.user_name, event.git_ref, event.repository.name, event.repository.homepage
    )
}

/// Only newly opened (or reopened) issues are reported; close/update/etc.
/// produce nothing.
fn render_issue(event: &IssueEvent) -> Option<String> {
    let attrs = &event.object_attributes;
    if attrs.action != "open" && attrs.action != "reopen" {
        return None;
    }

    Some(format!(
        "#### [#{} - {}]({})\n_[Issue]({}/issues) created by {} in [{}]({}) on {}_\n {}",
        attrs.iid,
        attrs.title,
        attrs.url,
        event.repository.homepage,
        event.user.username,
        event.repository.name,
        event.repository.homepage,
        attrs.created_at,
        quote_markdown(&attrs.description)
    ))
}

fn render_merge_request(event: &MergeRequestEvent) -> Option<String> {
    let attrs = &event.object_attributes;
    if attrs.action != "open" && attrs.action != "reopen" {
        return None;
    }

    Some(format!(
        "#### [!{} - {}]({})\n*[{}](https://gitlab.com/u/{}) created a merge request in [{}]({}) on {}*\n {}",
        attrs.iid,
        attrs.title,
        attrs.url,
        event.user.username,
        event.user.username,
        attrs.target.name,
        attrs.target.web_url,
        attrs.created_at,
        quote_markdown(&attrs.description)
    ))
}

/// Comments carry no action filter, but the commented-on object ("noteable")
/// decides the subtitle prefix, the article, and where id/title come from.
fn render_note(event: &NoteEvent) -> Result<String> {
    let attrs = &event.object_attributes;
    let noteable_type = attrs.noteable_type.to_lowercase();

    let missing = |field: &str| BridgeError::SchemaViolation(field.to_string());

    let (subtitle, article, noun) = match noteable_type.as_str() {
        "mergerequest" => {
            let mr = event.merge_request.as_ref().ok_or_else(|| missing("merge_request"))?;
            (format!("!{} - {}", mr.iid, mr.title), "a", "merge request")
        }
        "snippet" => {
            let snippet = event.snippet.as_ref().ok_or_else(|| missing("snippet"))?;
            (format!("${} - {}", snippet.iid, snippet.title), "a", "snippet")
        }
        "issue" => {
            let issue = event.issue.as_ref().ok_or_else(|| missing("issue"))?;
            (format!("#{} - {}", issue.iid, issue.title), "an", "issue")
        }
        "commit" => {
            let commit = event.commit.as_ref().ok_or_else(|| missing("commit"))?;
            (commit.id.clone(), "a", "commit")
        }
        other => {
            return Err(BridgeError::SchemaViolation(format!(
                "unknown noteable_type '{}'",
                other
            )));
        }
    };

    Ok(format!(
        "#### **New Comment** on [{}]({})\n_[{}](https://gitlab.com/u/{}) commented on {} {} in [{}]({}) on {}_\n {}",
        subtitle,
        attrs.url,
        event.user.username,
        event.user.username,
        article,
        noun,
        event.repository.name,
        event.repository.homepage,
        attrs.created_at,
        quote_markdown(&attrs.note)
    ))
}

/// Prefixes every line (blank ones included) with a Markdown block-quote
/// marker. An empty input yields an empty output, not a single quoted line.
pub fn quote_markdown(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    text.split('\n')
        .map(|line| format!("> {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn all_enabled() -> EventPolicy {
        EventPolicy {
            push: true,
            issue: true,
            tag_push: true,
            note: true,
            merge_request: true,
        }
    }

    fn all_disabled() -> EventPolicy {
        EventPolicy {
            push: false,
            issue: false,
            tag_push: false,
            note: false,
            merge_request: false,
        }
    }

    fn repository() -> Value {
        json!({"name": "proj", "homepage": "http://x/proj"})
    }

    #[test]
    fn quote_markdown_empty_stays_empty() {
        assert_eq!(quote_markdown(""), "");
    }

    #[test]
    fn quote_markdown_prefixes_every_line() {
        assert_eq!(quote_markdown("a\nb"), "> a\n> b");
    }

    #[test]
    fn quote_markdown_keeps_blank_lines() {
        assert_eq!(quote_markdown("a\n\nb"), "> a\n> \n> b");
    }

    #[test]
    fn missing_object_kind_is_schema_violation() {
        let payload = json!({"user_name": "alice"});
        let err = translate(&payload, &all_enabled()).unwrap_err();
        assert!(matches!(err, BridgeError::SchemaViolation(_)));
    }

    #[test]
    fn unrecognized_object_kind_produces_nothing() {
        let payload = json!({"object_kind": "pipeline"});
        assert_eq!(translate(&payload, &all_enabled()).unwrap(), None);
    }

    #[test]
    fn disabled_kind_produces_nothing_regardless_of_shape() {
        let payload = json!({"object_kind": "push"});
        assert_eq!(translate(&payload, &all_disabled()).unwrap(), None);
    }

    #[test]
    fn push_renders_generic_notice() {
        let payload = json!({
            "object_kind": "push",
            "user_name": "alice",
            "total_commits_count": 3,
            "ref": "refs/heads/main",
            "repository": repository(),
        });
        let text = translate(&payload, &all_enabled()).unwrap().unwrap();
        assert_eq!(
            text,
            "alice pushed 3 commit(s) into the `refs/heads/main` branch for project [proj](http://x/proj)."
        );
    }

    #[test]
    fn push_with_missing_repository_is_schema_violation() {
        let payload = json!({
            "object_kind": "push",
            "user_name": "alice",
            "total_commits_count": 3,
            "ref": "refs/heads/main",
        });
        let err = translate(&payload, &all_enabled()).unwrap_err();
        assert!(matches!(err, BridgeError::SchemaViolation(_)));
    }

    #[test]
    fn tag_push_mentions_actor_tag_and_project() {
        let payload = json!({
            "object_kind": "tag_push",
            "user_name": "alice",
            "ref": "v1.0",
            "repository": repository(),
        });
        let text = translate(&payload, &all_enabled()).unwrap().unwrap();
        assert!(text.contains("alice"));
        assert!(text.contains("v1.0"));
        assert!(text.contains("proj"));
    }

    fn issue_payload(action: &str) -> Value {
        json!({
            "object_kind": "issue",
            "user": {"username": "bob"},
            "repository": repository(),
            "object_attributes": {
                "iid": 12,
                "title": "Broken build",
                "url": "http://x/proj/issues/12",
                "action": action,
                "description": "line one\nline two",
                "created_at": "2017-09-20 08:39:25 UTC",
            },
        })
    }

    #[test]
    fn issue_open_renders_with_quoted_description() {
        let text = translate(&issue_payload("open"), &all_enabled())
            .unwrap()
            .unwrap();
        assert!(text.starts_with("#### [#12 - Broken build](http://x/proj/issues/12)"));
        assert!(text.contains("created by bob"));
        assert!(text.contains("> line one\n> line two"));
    }

    #[test]
    fn issue_reopen_renders() {
        assert!(translate(&issue_payload("reopen"), &all_enabled())
            .unwrap()
            .is_some());
    }

    #[test]
    fn issue_close_and_update_produce_nothing() {
        for action in ["close", "update"] {
            assert_eq!(
                translate(&issue_payload(action), &all_enabled()).unwrap(),
                None
            );
        }
    }

    #[test]
    fn issue_with_empty_description_renders_empty_quote_block() {
        let mut payload = issue_payload("open");
        payload["object_attributes"]["description"] = json!("");
        let text = translate(&payload, &all_enabled()).unwrap().unwrap();
        assert!(text.ends_with("\n "));
    }

    fn merge_request_payload(action: &str) -> Value {
        json!({
            "object_kind": "merge_request",
            "user": {"username": "bob"},
            "object_attributes": {
                "iid": 7,
                "title": "Add feature",
                "url": "http://x/proj/merge_requests/7",
                "action": action,
                "description": "does things",
                "created_at": "2017-09-20 08:39:25 UTC",
                "target": {"name": "proj", "web_url": "http://x/proj"},
            },
        })
    }

    #[test]
    fn merge_request_open_renders_with_target_link() {
        let text = translate(&merge_request_payload("open"), &all_enabled())
            .unwrap()
            .unwrap();
        assert!(text.starts_with("#### [!7 - Add feature](http://x/proj/merge_requests/7)"));
        assert!(text.contains("[bob](https://gitlab.com/u/bob)"));
        assert!(text.contains("[proj](http://x/proj)"));
        assert!(text.contains("> does things"));
    }

    #[test]
    fn merge_request_update_produces_nothing() {
        assert_eq!(
            translate(&merge_request_payload("update"), &all_enabled()).unwrap(),
            None
        );
    }

    fn note_payload(noteable_type: &str) -> Value {
        json!({
            "object_kind": "note",
            "user": {"username": "carol"},
            "repository": repository(),
            "object_attributes": {
                "noteable_type": noteable_type,
                "note": "looks good",
                "url": "http://x/proj/notes/1",
                "created_at": "2017-09-20 08:39:25 UTC",
            },
        })
    }

    #[test]
    fn note_on_merge_request_uses_bang_prefix_and_article_a() {
        let mut payload = note_payload("MergeRequest");
        payload["merge_request"] = json!({"iid": 7, "title": "Add feature"});
        let text = translate(&payload, &all_enabled()).unwrap().unwrap();
        assert!(text.contains("[!7 - Add feature](http://x/proj/notes/1)"));
        assert!(text.contains("commented on a merge request"));
    }

    #[test]
    fn note_classification_is_case_insensitive() {
        let mut payload = note_payload("mergerequest");
        payload["merge_request"] = json!({"iid": 7, "title": "Add feature"});
        let text = translate(&payload, &all_enabled()).unwrap().unwrap();
        assert!(text.contains("[!7 - Add feature]"));
    }

    #[test]
    fn note_on_issue_uses_hash_prefix_and_article_an() {
        let mut payload = note_payload("Issue");
        payload["issue"] = json!({"iid": 12, "title": "Broken build"});
        let text = translate(&payload, &all_enabled()).unwrap().unwrap();
        assert!(text.contains("[#12 - Broken build](http://x/proj/notes/1)"));
        assert!(text.contains("commented on an issue"));
    }

    #[test]
    fn note_on_snippet_uses_dollar_prefix() {
        let mut payload = note_payload("Snippet");
        payload["snippet"] = json!({"iid": 3, "title": "helper.sh"});
        let text = translate(&payload, &all_enabled()).unwrap().unwrap();
        assert!(text.contains("[$3 - helper.sh](http://x/proj/notes/1)"));
        assert!(text.contains("commented on a snippet"));
    }

    #[test]
    fn note_on_commit_uses_commit_id_as_subtitle() {
        let mut payload = note_payload("Commit");
        payload["commit"] = json!({"id": "abc123def"});
        let text = translate(&payload, &all_enabled()).unwrap().unwrap();
        assert!(text.contains("[abc123def](http://x/proj/notes/1)"));
        assert!(text.contains("commented on a commit"));
    }

    #[test]
    fn note_quotes_the_comment_body() {
        let mut payload = note_payload("Commit");
        payload["commit"] = json!({"id": "abc123def"});
        let text = translate(&payload, &all_enabled()).unwrap().unwrap();
        assert!(text.ends_with("\n > looks good"));
    }

    #[test]
    fn note_without_matching_noteable_object_is_schema_violation() {
        let payload = note_payload("MergeRequest");
        let err = translate(&payload, &all_enabled()).unwrap_err();
        assert!(matches!(err, BridgeError::SchemaViolation(_)));
    }

    #[test]
    fn note_with_unknown_noteable_type_is_schema_violation() {
        let payload = note_payload("DesignManagementDesign");
        let err = translate(&payload, &all_enabled()).unwrap_err();
        assert!(matches!(err, BridgeError::SchemaViolation(_)));
    }
}
