//! Subcommand implementations.
//!
//! Results go to stdout as JSON; diagnostics go through `tracing` on stderr.

use std::process::ExitCode;

use anyhow::Context;
use serde::Serialize;
use serde_json::{Value, json};

use esgadmin_auth::{
    HttpIdentityClient, Permission, PermissionResolver, Role, catalog, explain_permission,
    has_all_permissions, has_any_permission, user_permissions,
};

type Resolver = PermissionResolver<HttpIdentityClient>;

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{out}");
    Ok(())
}

fn not_authenticated() -> anyhow::Result<ExitCode> {
    eprintln!("not authenticated: run `esgadmin login --token <token>` first, or the stored credential was rejected");
    Ok(ExitCode::FAILURE)
}

pub async fn whoami(resolver: &Resolver, refresh: bool) -> anyhow::Result<ExitCode> {
    let Some(actor) = resolver.fetch_current_user(refresh).await else {
        return not_authenticated();
    };
    print_json(&*actor)?;
    Ok(ExitCode::SUCCESS)
}

pub async fn check(
    resolver: &Resolver,
    permissions: Vec<String>,
    any: bool,
    explain: bool,
) -> anyhow::Result<ExitCode> {
    let permissions: Vec<Permission> = permissions.into_iter().map(Permission::from).collect();

    for p in permissions.iter().filter(|p| !p.is_known()) {
        tracing::warn!(permission = %p, "permission is not in the catalog (v{})", catalog::CATALOG_VERSION);
    }

    let Some(actor) = resolver.fetch_current_user(false).await else {
        return not_authenticated();
    };

    // Verdict and explanation share this one actor snapshot.
    let actor = Some(actor.as_ref());
    let granted = if any {
        has_any_permission(&permissions, actor)
    } else {
        has_all_permissions(&permissions, actor)
    };

    if explain {
        let decisions: Vec<Value> = permissions
            .iter()
            .map(|p| {
                let decision = explain_permission(p, actor);
                json!({
                    "permission": decision.permission,
                    "granted": decision.granted,
                    "source": decision.source,
                    "reason": decision.reason(),
                })
            })
            .collect();
        print_json(&json!({ "granted": granted, "decisions": decisions }))?;
    } else {
        print_json(&json!({ "granted": granted }))?;
    }

    Ok(if granted {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

pub async fn permissions(resolver: &Resolver) -> anyhow::Result<ExitCode> {
    let Some(actor) = resolver.fetch_current_user(false).await else {
        return not_authenticated();
    };
    let effective = user_permissions(Some(actor.as_ref()));
    print_json(&json!({
        "user_id": actor.id,
        "role": actor.role,
        "permissions": effective,
    }))?;
    Ok(ExitCode::SUCCESS)
}

pub fn login(resolver: &Resolver, token: &str, role: Option<&str>) -> anyhow::Result<ExitCode> {
    if token.trim().is_empty() {
        anyhow::bail!("token must not be empty");
    }
    if let Some(hint) = role {
        if Role::parse(hint).is_none() {
            tracing::warn!(role = hint, "role hint is not a known role; it will grant nothing");
        }
    }
    resolver.login(token, role).context("failed to store credential")?;
    tracing::info!("credential stored");
    Ok(ExitCode::SUCCESS)
}

pub fn logout(resolver: &Resolver) -> anyhow::Result<ExitCode> {
    resolver.logout().context("failed to clear session")?;
    tracing::info!("session cleared");
    Ok(ExitCode::SUCCESS)
}

pub fn roles() -> anyhow::Result<ExitCode> {
    print_json(&role_table())?;
    Ok(ExitCode::SUCCESS)
}

/// Role table grouped by permission category.
fn role_table() -> Value {
    let roles: Vec<Value> = Role::ALL
        .iter()
        .map(|role| {
            let mut by_category = serde_json::Map::new();
            for p in role.default_permissions() {
                let entry = by_category
                    .entry(p.category().to_string())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if let Value::Array(list) = entry {
                    list.push(Value::from(p.as_str()));
                }
            }
            json!({
                "role": role,
                "description": role.description(),
                "permissions": by_category,
            })
        })
        .collect();

    json!({
        "catalog_version": catalog::CATALOG_VERSION,
        "roles": roles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_table_lists_both_roles() {
        let table = role_table();
        assert_eq!(table["catalog_version"], catalog::CATALOG_VERSION);

        let roles = table["roles"].as_array().unwrap();
        assert_eq!(roles.len(), 2);
        assert_eq!(roles[0]["role"], "admin");
        assert_eq!(roles[1]["role"], "super_admin");
    }

    #[test]
    fn role_table_groups_by_category() {
        let table = role_table();
        let admin_faqs = table["roles"][0]["permissions"]["faqs"].as_array().unwrap();
        assert!(admin_faqs.iter().any(|p| p == "view_faqs"));
        assert!(!admin_faqs.iter().any(|p| p == "delete_faqs"));

        let super_faqs = table["roles"][1]["permissions"]["faqs"].as_array().unwrap();
        assert!(super_faqs.iter().any(|p| p == "delete_faqs"));
    }
}
