use url::Url;

/// Resolves a (usually relative) business URL against the site origin and
/// strips its query string.
///
/// Search results carry tracking and pagination parameters on every business
/// link; none of them matter for the detail page, and keeping them would make
/// the same business look different across search pages.
///
/// # Examples
///
/// ```
/// use bizcrawl::url::absolute_business_url;
///
/// let url = absolute_business_url("https://www.yelp.com", "/biz/joes-diner?osq=Restaurants");
/// assert_eq!(url, "https://www.yelp.com/biz/joes-diner");
/// ```
pub fn absolute_business_url(origin: &str, href: &str) -> String {
    let without_query = match href.rsplit_once('?') {
        Some((head, _)) => head,
        None => href,
    };

    if without_query.starts_with("http://") || without_query.starts_with("https://") {
        return without_query.to_string();
    }

    let base = origin.trim_end_matches('/');
    if without_query.starts_with('/') {
        format!("{}{}", base, without_query)
    } else {
        format!("{}/{}", base, without_query)
    }
}

/// Ensures a proxy address carries an explicit scheme, defaulting to `http://`
pub fn normalize_proxy(proxy: &str) -> String {
    let proxy = proxy.trim();
    if proxy.starts_with("http://") || proxy.starts_with("https://") {
        proxy.to_string()
    } else {
        format!("http://{}", proxy)
    }
}

/// Extracts the real destination from an outbound redirect link
///
/// The site wraps external websites in a redirect such as
/// `/biz_redir?url=https%3A%2F%2Fexample.com&cachebuster=1`; the `url`
/// parameter holds the percent-encoded destination.
pub fn redirect_target(origin: &str, href: &str) -> Option<String> {
    let base = Url::parse(origin).ok()?;
    let link = base.join(href).ok()?;
    link.query_pairs()
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned())
}

/// Builds an endpoint URL under the origin with the given query parameters
pub fn search_url(origin: &str, path: &str, params: &[(&str, &str)]) -> Option<Url> {
    let base = Url::parse(origin).ok()?;
    let mut url = base.join(path).ok()?;
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Some(url)
}
