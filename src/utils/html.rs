/// Cleans user-submitted post and comment bodies.
///
/// Whitelist sanitization via ammonia: safe formatting tags (<b>, <p>, <a>...)
/// survive, <script>/<iframe> and event-handler attributes are stripped.
/// Leading and trailing whitespace is dropped so a body made only of
/// stripped markup ends up empty.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input).trim().to_string()
}
