//! Base layout shared by every server-rendered page.

use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::db::{Profile, PostSummary, Role};

const BASE_STYLE: &str = r"
body { font-family: system-ui, sans-serif; margin: 0; color: #18181b; background: #fafafa; }
.container { max-width: 960px; margin: 0 auto; padding: 0 1rem; }
header nav { display: flex; justify-content: space-between; align-items: center; padding: 1rem 0; }
header nav ul { display: flex; gap: 1rem; list-style: none; margin: 0; padding: 0; align-items: center; }
.card { background: #fff; border: 1px solid #e4e4e7; border-radius: 0.375rem; padding: 1rem; margin-bottom: 1rem; }
.tag { display: inline-block; background: #eef2ff; border-radius: 999px; padding: 0 0.5rem; margin-right: 0.25rem; font-size: 0.8rem; }
.meta { color: #52525b; font-size: 0.875rem; }
.alert { border-left: 4px solid #dc2626; background: #fef2f2; padding: 0.75rem 1rem; margin-bottom: 1rem; }
.notice { border-left: 4px solid #2563eb; background: #eff6ff; padding: 0.75rem 1rem; margin-bottom: 1rem; }
form.inline { display: inline; }
";

/// Page layout with role-aware navigation.
#[derive(Debug, Clone)]
pub struct BaseLayout<'a> {
    title: &'a str,
    user: Option<&'a Profile>,
}

impl<'a> BaseLayout<'a> {
    #[must_use]
    pub const fn new(title: &'a str, user: Option<&'a Profile>) -> Self {
        Self { title, user }
    }

    #[must_use]
    pub fn render(self, content: Markup) -> Markup {
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="UTF-8";
                    meta name="viewport" content="width=device-width, initial-scale=1.0";
                    title { (self.title) " - Campus Dialogue Hub" }
                    style { (PreEscaped(BASE_STYLE)) }
                }
                body {
                    (self.render_header())
                    main class="container" {
                        (content)
                    }
                    footer class="container" {
                        small class="meta" { "Campus Dialogue Hub" }
                    }
                }
            }
        }
    }

    fn render_header(&self) -> Markup {
        html! {
            header class="container" {
                nav {
                    ul {
                        li { a href="/" { strong { "Campus Dialogue Hub" } } }
                    }
                    ul {
                        @if self.user.is_some() {
                            li { a href="/home" { "Home" } }
                            li { a href="/questions" { "Questions" } }
                            li { a href="/semester-view" { "Semester View" } }
                            li { a href="/chat" { "Chat" } }
                            li { a href="/groups" { "Groups" } }
                            li { a href="/events" { "Events" } }
                        }
                        (self.render_auth_nav())
                    }
                }
            }
        }
    }

    fn render_auth_nav(&self) -> Markup {
        let Some(user) = self.user else {
            return html! { li { a href="/login" { "Login" } } };
        };

        html! {
            @match user.role_enum() {
                Some(Role::Teacher) => li { a href="/teacher" { "Dashboard" } },
                Some(Role::Student) => li { a href="/student" { "My Page" } },
                Some(Role::Admin) => li { a href="/admin" { "Admin" } },
                None => {},
            }
            li class="meta" { (user.display_name()) }
            li {
                form class="inline" method="post" action="/logout" {
                    button type="submit" { "Logout" }
                }
            }
        }
    }
}

/// Tag chips.
pub fn tag_list(tags: &[String]) -> Markup {
    html! {
        @for tag in tags {
            span class="tag" { (tag) }
        }
    }
}

/// One post in a listing.
pub fn post_card(post: &PostSummary) -> Markup {
    html! {
        article class="card" {
            h3 { a href={ "/post/" (post.id) } { (post.title) } }
            p { (post.preview) }
            div { (tag_list(&post.tags)) }
            p class="meta" {
                (post.author) " · " (post.created_at) " · "
                (post.votes) " votes · " (post.comment_count) " comments"
            }
        }
    }
}

/// Placeholder body when a listing is empty.
pub fn empty_state(message: &str) -> Markup {
    html! { p class="meta" { (message) } }
}
