use serde::{Deserialize, Serialize};
use super::types::OutcomeStatus;

/// 凭据类别，决定凭据缺失时落到哪个终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// 浏览器账号密码登录
    BrowserLogin,
    /// API 凭据，缺失视为等待授权
    ApiKeys,
}

impl CredentialKind {
    pub fn missing_status(&self) -> OutcomeStatus {
        match self {
            CredentialKind::BrowserLogin => OutcomeStatus::MissingCredentials,
            CredentialKind::ApiKeys => OutcomeStatus::PendingAuth,
        }
    }
}

/// 上传表单的 CSS 选择器集合
#[derive(Debug, Clone)]
pub struct FormSelectors {
    pub login_username: &'static str,
    pub login_password: &'static str,
    pub login_submit: &'static str,
    /// 登录完成的标志元素，超时未出现视为登录失败
    pub post_login_marker: &'static str,
    pub file_input: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub tags: &'static str,
    pub genre: &'static str,
    pub submit: &'static str,
    /// 上传完成的标志元素，超时未出现不影响结果
    pub completion_marker: &'static str,
}

/// 平台描述符，状态机的全部平台差异都在这里
///
/// 四个平台共用同一个状态机（`PlatformUploader`），每个平台只提供
/// 登录地址、上传表单选择器和凭据 scope 的命名方式。
#[derive(Debug, Clone)]
pub struct PlatformSpec {
    pub name: &'static str,
    pub login_url: &'static str,
    pub upload_url: &'static str,
    /// 凭据键名对，例如 ("EMAIL", "PASSWORD")
    pub credential_keys: (&'static str, &'static str),
    pub credential_kind: CredentialKind,
    pub selectors: FormSelectors,
}

impl PlatformSpec {
    /// 凭据存放的 scope 名称，按账号隔离
    pub fn credential_scope(&self, account_id: u32) -> String {
        format!("{}_account_{}", self.name, account_id)
    }

    pub fn spotify() -> Self {
        Self {
            name: "spotify",
            login_url: "https://accounts.spotify.com/login",
            upload_url: "https://creators.spotify.com/pod/dashboard/episode/wizard",
            credential_keys: ("CLIENT_ID", "CLIENT_SECRET"),
            credential_kind: CredentialKind::ApiKeys,
            selectors: FormSelectors {
                login_username: "input#login-username",
                login_password: "input#login-password",
                login_submit: "button#login-button",
                post_login_marker: "a[href='/pod/dashboard']",
                file_input: "input[type='file']",
                title: "input[name='title']",
                description: "textarea[name='description']",
                tags: "input[name='tags']",
                genre: "select[name='category']",
                submit: "button[type='submit']",
                completion_marker: ".episode-published",
            },
        }
    }

    pub fn soundcloud() -> Self {
        Self {
            name: "soundcloud",
            login_url: "https://soundcloud.com/signin",
            upload_url: "https://soundcloud.com/upload",
            credential_keys: ("CLIENT_ID", "CLIENT_SECRET"),
            credential_kind: CredentialKind::BrowserLogin,
            selectors: FormSelectors {
                login_username: "input[name='username']",
                login_password: "input[name='password']",
                login_submit: "button[type='submit']",
                post_login_marker: "a[href='/you/library']",
                file_input: "input[type='file']",
                title: "input[name='track[title]']",
                description: "textarea[name='track[description]']",
                tags: "input[name='track[tag_list]']",
                genre: "select[name='track[genre]']",
                submit: "button[type='submit']",
                completion_marker: ".upload-success",
            },
        }
    }

    pub fn audiomack() -> Self {
        Self {
            name: "audiomack",
            login_url: "https://www.audiomack.com/login",
            upload_url: "https://www.audiomack.com/upload",
            credential_keys: ("EMAIL", "PASSWORD"),
            credential_kind: CredentialKind::BrowserLogin,
            selectors: FormSelectors {
                login_username: "input[name='email']",
                login_password: "input[name='password']",
                login_submit: "button[type='submit']",
                post_login_marker: "a[href='/upload'], .profile",
                file_input: "input[type='file']",
                title: "input[name='title']",
                description: "textarea[name='description']",
                tags: "input[name='tags']",
                genre: "select[name='genre']",
                submit: "button[type='submit']",
                completion_marker: ".upload-success, .upload-complete",
            },
        }
    }

    pub fn apple() -> Self {
        Self {
            name: "apple",
            login_url: "https://podcastsconnect.apple.com",
            upload_url: "https://podcastsconnect.apple.com/my-podcasts",
            credential_keys: ("CLIENT_ID", "CLIENT_SECRET"),
            credential_kind: CredentialKind::ApiKeys,
            selectors: FormSelectors {
                login_username: "input[type='email']",
                login_password: "input[type='password']",
                login_submit: "button[type='submit']",
                post_login_marker: "main",
                file_input: "input[type='file']",
                title: "input[name='title']",
                description: "textarea[name='description']",
                tags: "input[name='keywords']",
                genre: "select[name='category']",
                submit: "button[type='submit']",
                completion_marker: ".publish-confirmation",
            },
        }
    }

    /// 全部内置平台
    pub fn builtin() -> Vec<PlatformSpec> {
        vec![
            Self::spotify(),
            Self::soundcloud(),
            Self::audiomack(),
            Self::apple(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_scope_is_account_scoped() {
        let spec = PlatformSpec::spotify();
        assert_eq!(spec.credential_scope(3), "spotify_account_3");
    }

    #[test]
    fn missing_status_follows_credential_kind() {
        assert_eq!(
            PlatformSpec::audiomack().credential_kind.missing_status(),
            OutcomeStatus::MissingCredentials
        );
        assert_eq!(
            PlatformSpec::apple().credential_kind.missing_status(),
            OutcomeStatus::PendingAuth
        );
    }

    #[test]
    fn builtin_covers_four_platforms() {
        let names: Vec<_> = PlatformSpec::builtin().iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["spotify", "soundcloud", "audiomack", "apple"]);
    }
}
