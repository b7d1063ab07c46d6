use maud::{DOCTYPE, Markup, PreEscaped, html};

#[derive(Debug, Clone)]
pub struct SessionView {
    pub email: String,
    pub display_name: String,
}

/// "sales-agent" -> "Sales Agent"
pub fn format_agent_name(app_name: &str) -> String {
    app_name
        .split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_login_page(error: Option<&str>) -> String {
    let markup = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "Sign in | Vexel" }
                style { (PreEscaped(styles())) }
            }
            body {
                main class="vx-main" {
                    section class="vx-card vx-login" {
                        h1 { "Sign in to Vexel" }
                        p class="vx-muted" { "Chat with your agents after signing in with Google." }
                        @if let Some(error) = error {
                            div class="vx-notice error" { (error) }
                        }
                        a class="vx-btn primary" href="/api/auth/login" { "Continue with Google" }
                    }
                }
            }
        }
    };
    markup.into_string()
}

pub fn render_index_page(session: &SessionView, agents: &[String]) -> String {
    let body = html! {
        section class="vx-card" {
            h1 { "Agents" }
            p class="vx-muted" { "Pick an agent to start a conversation." }
            div class="vx-agent-list" {
                @for app_name in agents {
                    a class="vx-agent" href={"/adk/" (app_name)} {
                        span class="vx-agent-name" { (format_agent_name(app_name)) " Agent" }
                        span class="vx-muted" { (app_name) }
                    }
                }
            }
        }
    };
    layout("Agents", Some(session), body)
}

pub fn render_chat_page(session: &SessionView, app_name: &str) -> String {
    let agent_name = format_agent_name(app_name);
    let body = html! {
        section class="vx-card vx-chat" data-app-name=(app_name) {
            header class="vx-chat-header" {
                h1 { (agent_name) " Agent" }
                p class="vx-muted" { "This is an interactive chat with the " (app_name) " agent." }
            }
            div id="chat-status" class="vx-notice" { "Initializing session..." }
            div id="chat-transcript" class="vx-transcript" {}
            form id="chat-form" class="vx-chat-form" {
                input id="chat-input" type="text" autocomplete="off"
                    placeholder="Send a message..." disabled;
                button type="submit" class="vx-btn primary" disabled { "Send" }
            }
        }
        script src="/assets/chat-app.js" defer {}
    };
    layout(&format!("{agent_name} Agent"), Some(session), body)
}

fn layout(title: &str, session: Option<&SessionView>, body: Markup) -> String {
    let markup = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " | Vexel" }
                style { (PreEscaped(styles())) }
            }
            body {
                header class="vx-topbar" {
                    a class="vx-brand" href="/" { "Vexel" }
                    div class="vx-session" {
                        @if let Some(session) = session {
                            span class="vx-session-label" {
                                (session.display_name) " · " (session.email)
                            }
                            a class="vx-btn subtle" href="/api/auth/logout" { "Log out" }
                        }
                    }
                }
                main class="vx-main" { (body) }
            }
        }
    };
    markup.into_string()
}

fn styles() -> &'static str {
    r#"
:root { color-scheme: light dark; }
* { box-sizing: border-box; }
body { margin: 0; font-family: ui-sans-serif, system-ui, sans-serif; background: #f4f4f5; color: #18181b; }
.vx-topbar { display: flex; align-items: center; justify-content: space-between; padding: 0.75rem 1.5rem; border-bottom: 1px solid #e4e4e7; background: #fff; }
.vx-brand { font-weight: 700; text-decoration: none; color: inherit; }
.vx-session { display: flex; align-items: center; gap: 0.75rem; }
.vx-session-label { font-size: 0.875rem; color: #52525b; }
.vx-main { max-width: 48rem; margin: 2rem auto; padding: 0 1rem; }
.vx-card { background: #fff; border: 1px solid #e4e4e7; border-radius: 0.75rem; padding: 1.5rem; }
.vx-muted { color: #71717a; font-size: 0.875rem; }
.vx-btn { display: inline-block; padding: 0.5rem 1rem; border: 1px solid #d4d4d8; border-radius: 0.5rem; background: #fff; color: inherit; text-decoration: none; cursor: pointer; font-size: 0.875rem; }
.vx-btn.primary { background: #18181b; border-color: #18181b; color: #fff; }
.vx-btn.subtle { border-color: transparent; color: #71717a; }
.vx-notice { margin: 1rem 0; padding: 0.5rem 0.75rem; border-radius: 0.5rem; background: #f0f9ff; font-size: 0.875rem; }
.vx-notice.error { background: #fef2f2; color: #b91c1c; }
.vx-agent-list { display: grid; gap: 0.75rem; margin-top: 1rem; }
.vx-agent { display: flex; justify-content: space-between; padding: 0.75rem 1rem; border: 1px solid #e4e4e7; border-radius: 0.5rem; text-decoration: none; color: inherit; }
.vx-transcript { display: flex; flex-direction: column; gap: 0.5rem; min-height: 16rem; margin: 1rem 0; }
.vx-bubble { max-width: 80%; padding: 0.5rem 0.75rem; border-radius: 0.75rem; white-space: pre-wrap; }
.vx-bubble.user { align-self: flex-end; background: #18181b; color: #fff; }
.vx-bubble.agent { align-self: flex-start; background: #f4f4f5; }
.vx-bubble.agent.error { background: #fef2f2; color: #b91c1c; }
.vx-chat-form { display: flex; gap: 0.5rem; }
.vx-chat-form input { flex: 1; padding: 0.5rem 0.75rem; border: 1px solid #d4d4d8; border-radius: 0.5rem; font-size: 0.875rem; }
"#
}
