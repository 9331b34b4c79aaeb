/// Build a deep link to a message in a supergroup or channel.
///
/// Bot API ids carry a `-100` prefix that the `t.me/c/` form leaves out:
/// `-1001234567890` → `https://t.me/c/1234567890/{msg_id}`.
pub fn build_link(chat_id: i64, message_id: i64) -> String {
    let id = chat_id.to_string();
    let bare = id.strip_prefix("-100").unwrap_or(&id);
    format!("https://t.me/c/{}/{}", bare, message_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supergroup_link() {
        let link = build_link(-1001234567890, 42);
        assert_eq!(link, "https://t.me/c/1234567890/42");
    }

    #[test]
    fn test_link_with_large_id() {
        let link = build_link(-1009999999999, 999);
        assert_eq!(link, "https://t.me/c/9999999999/999");
    }

    #[test]
    fn test_basic_group_id_left_as_is() {
        // Basic groups have no -100 prefix; nothing to strip.
        let link = build_link(-123456, 1);
        assert_eq!(link, "https://t.me/c/-123456/1");
    }

    #[test]
    fn test_positive_id() {
        let link = build_link(12345, 1);
        assert_eq!(link, "https://t.me/c/12345/1");
    }
}
