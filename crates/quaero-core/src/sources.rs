//! Data source resolution.
//!
//! Computes the set of collections a user may query for one request,
//! derived purely from identity and the active working context. No
//! network or store calls happen here; the result is never persisted.

use tracing::debug;

use crate::models::{AccessKind, DataSource, SourceKind};

/// Active working context handed in by the caller.
#[derive(Debug, Clone)]
pub struct ActiveContext {
    pub key: String,
    /// Store handle of the context's shared collection.
    pub store_handle: String,
}

/// Derive a store-safe slug from an email local-part: lower-cased,
/// `.` and `-` replaced with `_`. Deterministic per email.
pub fn email_slug(email: &str) -> Option<String> {
    let local = email.split('@').next()?.trim();
    if local.is_empty() {
        return None;
    }
    Some(
        local
            .to_lowercase()
            .chars()
            .map(|c| if c == '.' || c == '-' { '_' } else { c })
            .collect(),
    )
}

/// Resolve the data sources one user may query.
///
/// Derivation rules:
/// - one org/context source when an active context (key + store) is given
///   and, if an accessible-keys list is supplied, the key appears in it;
/// - exactly one personal source per user, store handle derived from the
///   email local-part so the namespace exists without prior provisioning;
/// - one private-cloud source derived the same way;
/// - one shared-cloud source keyed by the active context, if present.
///
/// Always returns at least two sources when an email is given; omitting
/// the context simply omits the context-scoped sources.
pub fn resolve_sources(
    user_id: &str,
    user_email: Option<&str>,
    active_context: Option<&ActiveContext>,
    accessible_context_keys: Option<&[String]>,
) -> Vec<DataSource> {
    let mut sources = Vec::new();

    let context = active_context.filter(|ctx| match accessible_context_keys {
        Some(keys) => keys.iter().any(|k| k == &ctx.key),
        None => true,
    });
    if active_context.is_some() && context.is_none() {
        debug!(
            user_id,
            "Active context not in accessible keys, omitting context sources"
        );
    }

    if let Some(ctx) = context {
        sources.push(DataSource {
            id: format!("org:{}", ctx.key),
            kind: SourceKind::OrgShared,
            store_handle: ctx.store_handle.clone(),
            access: AccessKind::OrgMembership,
            owner_id: None,
            context_key: Some(ctx.key.clone()),
            display_name: format!("Organization ({})", ctx.key),
        });
    }

    if let Some(slug) = user_email.and_then(email_slug) {
        sources.push(DataSource {
            id: format!("personal:{user_id}"),
            kind: SourceKind::Personal,
            store_handle: format!("personal_{slug}"),
            access: AccessKind::PrivateOwner,
            owner_id: Some(user_id.to_string()),
            context_key: None,
            display_name: "Personal documents".to_string(),
        });

        sources.push(DataSource {
            id: format!("cloud_private:{user_id}"),
            kind: SourceKind::CloudPrivate,
            store_handle: format!("cloud_private_{slug}"),
            access: AccessKind::PrivateOwner,
            owner_id: Some(user_id.to_string()),
            context_key: None,
            display_name: "Private cloud documents".to_string(),
        });
    }

    if let Some(ctx) = context {
        sources.push(DataSource {
            id: format!("cloud_shared:{}", ctx.key),
            kind: SourceKind::CloudShared,
            store_handle: format!("cloud_shared_{}", ctx.key),
            access: AccessKind::SharedOpen,
            owner_id: None,
            context_key: Some(ctx.key.clone()),
            display_name: format!("Shared cloud ({})", ctx.key),
        });
    }

    debug!(
        user_id,
        source_count = sources.len(),
        has_context = context.is_some(),
        "Resolved data sources"
    );

    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ActiveContext {
        ActiveContext {
            key: "acme".to_string(),
            store_handle: "org_acme_store".to_string(),
        }
    }

    #[test]
    fn test_email_slug_normalization() {
        assert_eq!(email_slug("Jane.Doe@corp.com").as_deref(), Some("jane_doe"));
        assert_eq!(
            email_slug("a-b.c@example.org").as_deref(),
            Some("a_b_c")
        );
        assert_eq!(email_slug("UPPER@x.io").as_deref(), Some("upper"));
    }

    #[test]
    fn test_email_slug_empty_local_part() {
        assert_eq!(email_slug("@nowhere.com"), None);
        assert_eq!(email_slug(""), None);
    }

    #[test]
    fn test_personal_store_is_case_and_punctuation_insensitive() {
        let a = resolve_sources("u1", Some("Jane.Doe@corp.com"), None, None);
        let b = resolve_sources("u1", Some("jane-doe@corp.com"), None, None);
        let handle = |sources: &[DataSource]| {
            sources
                .iter()
                .find(|s| s.kind == SourceKind::Personal)
                .unwrap()
                .store_handle
                .clone()
        };
        assert_eq!(handle(&a), handle(&b));
        assert_eq!(handle(&a), "personal_jane_doe");
    }

    #[test]
    fn test_email_yields_at_least_two_sources() {
        let sources = resolve_sources("u1", Some("user@x.io"), None, None);
        assert_eq!(sources.len(), 2);
        assert!(sources.iter().any(|s| s.kind == SourceKind::Personal));
        assert!(sources.iter().any(|s| s.kind == SourceKind::CloudPrivate));
        for source in &sources {
            assert_eq!(source.access, AccessKind::PrivateOwner);
            assert_eq!(source.owner_id.as_deref(), Some("u1"));
        }
    }

    #[test]
    fn test_active_context_adds_org_and_shared_cloud() {
        let context = ctx();
        let sources = resolve_sources("u1", Some("user@x.io"), Some(&context), None);
        assert_eq!(sources.len(), 4);

        let org = sources
            .iter()
            .find(|s| s.kind == SourceKind::OrgShared)
            .unwrap();
        assert_eq!(org.store_handle, "org_acme_store");
        assert_eq!(org.access, AccessKind::OrgMembership);
        assert_eq!(org.context_key.as_deref(), Some("acme"));

        let shared = sources
            .iter()
            .find(|s| s.kind == SourceKind::CloudShared)
            .unwrap();
        assert_eq!(shared.store_handle, "cloud_shared_acme");
        assert_eq!(shared.access, AccessKind::SharedOpen);
    }

    #[test]
    fn test_context_not_in_accessible_keys_is_omitted() {
        let context = ctx();
        let keys = vec!["other".to_string()];
        let sources = resolve_sources("u1", Some("user@x.io"), Some(&context), Some(&keys));
        assert_eq!(sources.len(), 2);
        assert!(!sources.iter().any(|s| s.kind == SourceKind::OrgShared));
        assert!(!sources.iter().any(|s| s.kind == SourceKind::CloudShared));
    }

    #[test]
    fn test_context_in_accessible_keys_is_kept() {
        let context = ctx();
        let keys = vec!["acme".to_string(), "other".to_string()];
        let sources = resolve_sources("u1", Some("user@x.io"), Some(&context), Some(&keys));
        assert_eq!(sources.len(), 4);
    }

    #[test]
    fn test_no_email_no_context_yields_nothing() {
        let sources = resolve_sources("u1", None, None, None);
        assert!(sources.is_empty());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let context = ctx();
        let a = resolve_sources("u1", Some("jane@x.io"), Some(&context), None);
        let b = resolve_sources("u1", Some("jane@x.io"), Some(&context), None);
        let ids = |s: &[DataSource]| s.iter().map(|d| d.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&a), ids(&b));
    }
}
