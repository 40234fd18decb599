//! HTML pages and htmx fragments
//!
//! The browser client is plain HTML driven by htmx and its SSE extension:
//! the index page listens for `newMessage` events on `/events` and inserts
//! each pushed line at the top of the log.

use crate::broadcast::render::{escape_html, render_line, EVENT_NAME};
use crate::store::Message;

const HTMX_SRC: &str = "https://unpkg.com/htmx.org@1.9.12";
const HTMX_SSE_SRC: &str = "https://unpkg.com/htmx.org@1.9.12/dist/ext/sse.js";

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<link rel="stylesheet" href="/static/style.css">
<script src="{htmx}"></script>
<script src="{sse}"></script>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape_html(title),
        htmx = HTMX_SRC,
        sse = HTMX_SSE_SRC,
        body = body,
    )
}

fn credentials_form(action: &str, submit: &str) -> String {
    format!(
        r##"<form hx-post="{action}" hx-target="#result" action="{action}" method="post">
<input type="text" name="username" placeholder="username" autocomplete="username" required>
<input type="password" name="password" placeholder="password" required>
<button type="submit">{submit}</button>
</form>
<div id="result"></div>"##,
    )
}

pub fn login_page() -> String {
    let body = format!(
        r#"<main class="terminal">
<h1>&gt; login</h1>
{}
<p><a href="/register">/register</a></p>
</main>"#,
        credentials_form("/login", "login")
    );
    layout("login", &body)
}

pub fn register_page() -> String {
    let body = format!(
        r#"<main class="terminal">
<h1>&gt; register</h1>
{}
<p><a href="/login">/login</a></p>
</main>"#,
        credentials_form("/register", "register")
    );
    layout("register", &body)
}

/// Chat page; `messages` are most recent first, matching the live insert order
pub fn index_page(username: &str, messages: &[Message]) -> String {
    let log: String = messages
        .iter()
        .map(|m| {
            let mut line = render_line(m);
            line.push('\n');
            line
        })
        .collect();

    let body = format!(
        r#"<main class="terminal">
<header>
<span class="prompt">{user}@murmur</span>
<form action="/logout" method="post" class="logout"><button type="submit">logout</button></form>
</header>
<form hx-post="/send" hx-swap="none" hx-on::after-request="this.reset()" class="composer">
<input type="text" name="content" placeholder="say something" autocomplete="off" required>
<button type="submit">send</button>
</form>
<div id="messages" hx-ext="sse" sse-connect="/events" sse-swap="{event}" hx-swap="afterbegin">
{log}</div>
</main>"#,
        user = escape_html(username),
        event = EVENT_NAME,
        log = log,
    );
    layout("murmur", &body)
}

pub fn alert_user_exists() -> &'static str {
    r#"<div class="alert error">[!] system_err: user_exists</div>"#
}

pub fn alert_invalid_credentials() -> &'static str {
    r#"<div class="alert error">[!] system_err: invalid_credentials</div>"#
}

pub fn alert_invalid_input() -> &'static str {
    r#"<div class="alert error">[!] system_err: invalid_input</div>"#
}

pub fn alert_registration_complete() -> &'static str {
    r#"<div class="alert success">[+] system_msg: registration_complete. <a href="/login" style="color: inherit">/login</a></div>"#
}
