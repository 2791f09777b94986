const MAX_USERNAME_LEN: usize = 39;
const MAX_REPO_NAME_LEN: usize = 100;

fn is_valid_name_char(c: char, allow_period: bool) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || (allow_period && c == '.')
}

fn validate_name(
    name: &str,
    entity: &str,
    max_len: usize,
    allow_period: bool,
    forbid_leading_special: bool,
) -> Result<(), String> {
    if name.is_empty() {
        return Err(format!("{entity} name cannot be empty"));
    }
    if name.len() > max_len {
        return Err(format!("{entity} name cannot exceed {max_len} characters"));
    }
    if !name.chars().all(|c| is_valid_name_char(c, allow_period)) {
        let mut allowed = "alphanumeric characters, hyphens, and underscores".to_string();
        if allow_period {
            allowed.push_str(", and periods");
        }
        return Err(format!("{entity} name can only contain {allowed}"));
    }
    if forbid_leading_special && (name.starts_with('-') || name.starts_with('_')) {
        return Err(format!(
            "{entity} name cannot start with a hyphen or underscore"
        ));
    }
    Ok(())
}

/// Usernames are shared by users and organizations.
pub fn validate_username(name: &str) -> Result<(), String> {
    validate_name(name, "User", MAX_USERNAME_LEN, false, true)
}

pub fn validate_repository_name(name: &str) -> Result<(), String> {
    validate_name(name, "Repository", MAX_REPO_NAME_LEN, true, false)?;

    // Clone URLs may carry an optional ".git" suffix, which is stripped before lookup
    if name.ends_with(".git") {
        return Err("Repository name cannot end with .git".to_string());
    }
    if name == "." || name == ".." {
        return Err("Repository name cannot be . or ..".to_string());
    }
    Ok(())
}
