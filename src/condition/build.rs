//! Construction of condition trees from build file elements
//!
//! Attribute values are expanded against the property store first, then
//! checked and converted. Every configuration problem surfaces here, before
//! any predicate is evaluated.

use crate::condition::{
    to_boolean, Available, CompareMode, Condition, ConditionContainer, Contains, Equals,
    FileType, FilesMatch, Http, IsFalse, IsLastModified, IsReachable, IsSet, IsTrue, MatchOptions,
    Matches, Os, Socket, Timestamp, UpToDate, DEFAULT_DATETIME_PATTERN,
};
use crate::config;
use crate::error::{ConditionError, ConditionResult};
use crate::runner::Properties;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Turns configuration elements into evaluable [`Condition`]s
#[derive(Debug, Clone, Copy)]
pub struct ConditionBuilder<'a> {
    properties: &'a Properties,
    basedir: &'a Path,
}

impl<'a> ConditionBuilder<'a> {
    pub fn new(properties: &'a Properties, basedir: &'a Path) -> Self {
        ConditionBuilder {
            properties,
            basedir,
        }
    }

    /// Build every element of a nested condition list, in order
    pub fn container(&self, elements: &[config::Condition]) -> ConditionResult<ConditionContainer> {
        elements.iter().map(|element| self.build(element)).collect()
    }

    /// Build one element; it must carry exactly one tag
    pub fn build(&self, element: &config::Condition) -> ConditionResult<Condition> {
        let tags = element.tags();
        match tags.len() {
            0 => {
                return Err(ConditionError::config(
                    "A condition element must name a condition",
                ))
            }
            1 => {}
            _ => {
                return Err(ConditionError::config(format!(
                    "A condition element may only name one condition, found: {}",
                    tags.join(", ")
                )))
            }
        }

        if let Some(children) = &element.and {
            return Ok(Condition::and(self.container(children)?));
        }
        if let Some(children) = &element.or {
            return Ok(Condition::or(self.container(children)?));
        }
        if let Some(children) = &element.xor {
            return Ok(Condition::xor(self.container(children)?));
        }
        if let Some(children) = &element.not {
            return Condition::not(self.container(children)?);
        }

        if let Some(equals) = &element.equals {
            return self.equals(equals).map(Condition::Equals);
        }
        if let Some(contains) = &element.contains {
            return self.contains(contains).map(Condition::Contains);
        }
        if let Some(matches) = &element.matches {
            return self.matches(matches).map(Condition::Matches);
        }
        if let Some(isset) = &element.isset {
            let property = self.required(&isset.property)?.ok_or_else(|| {
                ConditionError::config("No property specified for isset condition")
            })?;
            return Ok(Condition::IsSet(IsSet::new(property)));
        }
        if let Some(istrue) = &element.istrue {
            let value = self
                .required(&istrue.value)?
                .ok_or_else(|| ConditionError::config("Nothing to test for truth"))?;
            return Ok(Condition::IsTrue(IsTrue::new(value)));
        }
        if let Some(isfalse) = &element.isfalse {
            let value = self
                .required(&isfalse.value)?
                .ok_or_else(|| ConditionError::config("Nothing to test for falsehood"))?;
            return Ok(Condition::IsFalse(IsFalse::new(value)));
        }
        if let Some(os) = &element.os {
            return self.os(os).map(Condition::Os);
        }
        if let Some(available) = &element.available {
            return self.available(available).map(Condition::Available);
        }
        if let Some(files) = &element.filesmatch {
            return self.filesmatch(files).map(Condition::FilesMatch);
        }
        if let Some(modified) = &element.islastmodified {
            return self.islastmodified(modified).map(Condition::IsLastModified);
        }
        if let Some(uptodate) = &element.uptodate {
            return self.uptodate(uptodate).map(Condition::UpToDate);
        }
        if let Some(socket) = &element.socket {
            return self.socket(socket).map(Condition::Socket);
        }
        if let Some(http) = &element.http {
            return self.http(http).map(Condition::Http);
        }
        match &element.isreachable {
            Some(reachable) => self.isreachable(reachable).map(Condition::IsReachable),
            None => Err(ConditionError::config("A condition element must name a condition")),
        }
    }

    fn equals(&self, equals: &config::Equals) -> ConditionResult<Equals> {
        let (arg1, arg2) = match (self.attr(&equals.arg1)?, self.attr(&equals.arg2)?) {
            (Some(arg1), Some(arg2)) => (arg1, arg2),
            _ => {
                return Err(ConditionError::config(
                    "both arg1 and arg2 are required in equals",
                ))
            }
        };
        Ok(Equals::new(arg1, arg2)
            .with_trim(self.flag(&equals.trim, false)?)
            .with_case_sensitive(self.flag(&equals.casesensitive, true)?))
    }

    fn contains(&self, contains: &config::Contains) -> ConditionResult<Contains> {
        match (self.attr(&contains.string)?, self.attr(&contains.substring)?) {
            (Some(string), Some(substring)) => Ok(Contains::new(string, substring)
                .with_case_sensitive(self.flag(&contains.casesensitive, true)?)),
            _ => Err(ConditionError::config(
                "both string and substring are required in contains",
            )),
        }
    }

    fn matches(&self, matches: &config::Matches) -> ConditionResult<Matches> {
        let string = self
            .attr(&matches.string)?
            .ok_or_else(|| ConditionError::config("Parameter string is required in matches."))?;
        let pattern = self
            .required(&matches.pattern)?
            .ok_or_else(|| ConditionError::config("Parameter pattern is required in matches."))?;
        let options = MatchOptions {
            case_sensitive: self.flag(&matches.casesensitive, true)?,
            multiline: self.flag(&matches.multiline, false)?,
            singleline: self.flag(&matches.singleline, false)?,
        };
        Matches::new(string, &pattern, options)
    }

    fn os(&self, os: &config::Os) -> ConditionResult<Os> {
        let mut condition = Os::new();
        if let Some(family) = self.attr(&os.family)? {
            condition = condition.with_family(&family)?;
        }
        if let Some(name) = self.attr(&os.name)? {
            condition = condition.with_name(name);
        }
        if let Some(arch) = self.attr(&os.arch)? {
            condition = condition.with_arch(arch);
        }
        if let Some(version) = self.attr(&os.version)? {
            condition = condition.with_version(version);
        }
        Ok(condition)
    }

    fn available(&self, available: &config::Available) -> ConditionResult<Available> {
        let file = self
            .required(&available.file)?
            .ok_or_else(|| ConditionError::config("file attribute is required in available"))?;

        let mut condition = Available::new(file, self.basedir)
            .with_search_parents(self.flag(&available.searchparents, false)?);
        if let Some(file_type) = self.attr(&available.file_type)? {
            condition = condition.with_type(FileType::from_str(&file_type)?);
        }
        if let Some(filepath) = self.attr(&available.filepath)? {
            let entries = env::split_paths(&filepath)
                .filter(|entry| !entry.as_os_str().is_empty())
                .map(|entry| self.resolve(&entry.to_string_lossy()))
                .collect();
            condition = condition.with_filepath(entries);
        }
        Ok(condition)
    }

    fn filesmatch(&self, files: &config::FilesMatch) -> ConditionResult<FilesMatch> {
        match (self.required(&files.file1)?, self.required(&files.file2)?) {
            (Some(file1), Some(file2)) => {
                Ok(FilesMatch::new(self.resolve(&file1), self.resolve(&file2))
                    .with_text_file(self.flag(&files.textfile, false)?))
            }
            _ => Err(ConditionError::config(
                "both file1 and file2 are required in filesmatch",
            )),
        }
    }

    fn islastmodified(&self, modified: &config::IsLastModified) -> ConditionResult<IsLastModified> {
        let file = self
            .required(&modified.file)?
            .ok_or_else(|| ConditionError::config("file attribute is required in islastmodified"))?;

        let expected = match (self.attr(&modified.millis)?, self.attr(&modified.datetime)?) {
            (Some(_), Some(_)) => {
                return Err(ConditionError::config(
                    "Only one of dateTime and millis can be set",
                ))
            }
            (Some(millis), None) => {
                Timestamp::Millis(self.number::<i64>(&millis, "millis", "islastmodified")?)
            }
            (None, Some(datetime)) => {
                let pattern = self
                    .attr(&modified.pattern)?
                    .unwrap_or_else(|| DEFAULT_DATETIME_PATTERN.to_string());
                Timestamp::parse(&datetime, &pattern)?
            }
            (None, None) => return Err(ConditionError::config("millis or dateTime is required")),
        };

        let mut condition = IsLastModified::new(self.resolve(&file), expected);
        if let Some(mode) = self.attr(&modified.mode)? {
            condition = condition.with_mode(CompareMode::from_str(&mode)?);
        }
        Ok(condition)
    }

    fn uptodate(&self, uptodate: &config::UpToDate) -> ConditionResult<UpToDate> {
        let target = self
            .required(&uptodate.targetfile)?
            .ok_or_else(|| ConditionError::config("The targetfile attribute has to be set"))?;
        let srcfile = self.required(&uptodate.srcfile)?;
        let srcfiles = self.required(&uptodate.srcfiles)?;
        if srcfile.is_none() && srcfiles.is_none() {
            return Err(ConditionError::config(
                "At least one srcfile or srcfiles pattern must be set",
            ));
        }

        let mut condition = UpToDate::new(self.resolve(&target));
        if let Some(srcfile) = srcfile {
            condition = condition.with_source(self.resolve(&srcfile));
        }
        if let Some(pattern) = srcfiles {
            condition = condition.with_pattern(&pattern, self.basedir)?;
        }
        Ok(condition)
    }

    fn socket(&self, socket: &config::Socket) -> ConditionResult<Socket> {
        let server = self
            .required(&socket.server)?
            .ok_or_else(|| ConditionError::config("No server specified in socket condition"))?;
        let port = self
            .required(&socket.port)?
            .ok_or_else(|| ConditionError::config("No port specified in socket condition"))?;
        Ok(Socket::new(server, self.number::<u16>(&port, "port", "socket")?))
    }

    fn http(&self, http: &config::Http) -> ConditionResult<Http> {
        let url = self
            .required(&http.url)?
            .ok_or_else(|| ConditionError::config("No url specified in http condition"))?;

        let mut condition = Http::new(&url)?
            .with_follow_redirects(self.flag(&http.followredirects, true)?);
        if let Some(code) = self.attr(&http.errorsbeginat)? {
            condition =
                condition.with_errors_begin_at(self.number(&code, "errorsbeginat", "http")?);
        }
        if let Some(method) = self.attr(&http.requestmethod)? {
            condition = condition.with_method(&method)?;
        }
        if let Some(timeout) = self.attr(&http.readtimeout)? {
            condition = condition.with_read_timeout(self.number(&timeout, "readtimeout", "http")?);
        }
        Ok(condition)
    }

    fn isreachable(&self, reachable: &config::IsReachable) -> ConditionResult<IsReachable> {
        let host = self.required(&reachable.host)?;
        let url = self.required(&reachable.url)?;
        let mut condition = match (host, url) {
            (Some(_), Some(_)) => {
                return Err(ConditionError::config(
                    "Both url and host have been specified",
                ))
            }
            (Some(host), None) => IsReachable::host(host),
            (None, Some(url)) => IsReachable::url(&url)?,
            (None, None) => return Err(ConditionError::config("No hostname defined")),
        };

        if let Some(timeout) = self.attr(&reachable.timeout)? {
            let seconds = self.number::<i64>(&timeout, "timeout", "isreachable")?;
            if seconds < 0 {
                return Err(ConditionError::config(format!(
                    "Invalid timeout value {}",
                    seconds
                )));
            }
            condition = condition.with_timeout(Duration::from_secs(seconds as u64));
        }
        Ok(condition)
    }

    /// An optional attribute, expanded
    fn attr(&self, value: &Option<String>) -> ConditionResult<Option<String>> {
        match value {
            Some(raw) => Ok(Some(self.properties.expand(raw)?)),
            None => Ok(None),
        }
    }

    /// Like [`attr`](Self::attr), treating an empty value as absent
    fn required(&self, value: &Option<String>) -> ConditionResult<Option<String>> {
        Ok(self.attr(value)?.filter(|v| !v.is_empty()))
    }

    fn flag(&self, value: &Option<String>, default: bool) -> ConditionResult<bool> {
        Ok(self.attr(value)?.map_or(default, |v| to_boolean(&v)))
    }

    fn number<T>(&self, value: &str, name: &str, tag: &str) -> ConditionResult<T>
    where
        T: FromStr,
    {
        value.trim().parse().map_err(|_| {
            ConditionError::config(format!(
                "Invalid value '{}' for attribute {} of <{}>",
                value, name, tag
            ))
        })
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.basedir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Environment, EvalContext};
    use crate::config::Condition as Element;

    fn element(yaml: &str) -> Element {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn build(props: &Properties, yaml: &str) -> ConditionResult<Condition> {
        ConditionBuilder::new(props, Path::new("/work")).build(&element(yaml))
    }

    fn eval(props: &Properties, condition: &Condition) -> bool {
        let env = Environment::new(PathBuf::from("/work"));
        condition.evaluate(&EvalContext::new(props, &env)).unwrap()
    }

    fn config_error(yaml: &str) -> String {
        let err = build(&Properties::new(), yaml).unwrap_err();
        assert!(err.is_configuration());
        err.to_string()
    }

    #[test]
    fn test_build_composite_tree() {
        let props = Properties::new();
        let condition = build(
            &props,
            r#"
or:
  - equals: { arg1: x, arg2: x }
  - equals: { arg1: y, arg2: z }
"#,
        )
        .unwrap();

        assert_eq!(condition.tag(), "or");
        assert_eq!(condition.children().len(), 2);
        assert!(eval(&props, &condition));
    }

    #[test]
    fn test_attributes_are_expanded() {
        let props: Properties = [("flavour", "vanilla")].into_iter().collect();
        let condition = build(&props, "equals: { arg1: '${flavour}', arg2: vanilla }").unwrap();
        assert!(eval(&props, &condition));
    }

    #[test]
    fn test_scalar_attributes() {
        let props = Properties::new();
        let condition = build(&props, "equals: { arg1: 1, arg2: '1', casesensitive: no }").unwrap();
        match &condition {
            Condition::Equals(equals) => assert!(!equals.case_sensitive),
            other => panic!("unexpected {:?}", other),
        }
        assert!(eval(&props, &condition));
    }

    #[test]
    fn test_not_requires_one_child() {
        assert_eq!(
            config_error("not: []"),
            "You must nest a condition into <not>"
        );
        assert_eq!(
            config_error("not: [ { istrue: { value: on } }, { istrue: { value: off } } ]"),
            "You must not nest more than one condition into <not>"
        );
    }

    #[test]
    fn test_element_with_two_tags() {
        let message = config_error("{ isset: { property: a }, istrue: { value: yes } }");
        assert!(message.contains("isset, istrue"));
    }

    #[test]
    fn test_required_attribute_messages() {
        assert_eq!(
            config_error("equals: { arg1: a }"),
            "both arg1 and arg2 are required in equals"
        );
        assert_eq!(
            config_error("contains: { string: a }"),
            "both string and substring are required in contains"
        );
        assert_eq!(
            config_error("matches: { pattern: a }"),
            "Parameter string is required in matches."
        );
        assert_eq!(
            config_error("matches: { string: a }"),
            "Parameter pattern is required in matches."
        );
        assert_eq!(config_error("isset: {}"), "No property specified for isset condition");
        assert_eq!(config_error("istrue: {}"), "Nothing to test for truth");
        assert_eq!(config_error("isfalse: {}"), "Nothing to test for falsehood");
        assert_eq!(config_error("available: {}"), "file attribute is required in available");
        assert_eq!(
            config_error("filesmatch: { file1: a }"),
            "both file1 and file2 are required in filesmatch"
        );
        assert_eq!(
            config_error("uptodate: { srcfile: a }"),
            "The targetfile attribute has to be set"
        );
        assert_eq!(
            config_error("uptodate: { targetfile: a }"),
            "At least one srcfile or srcfiles pattern must be set"
        );
        assert_eq!(config_error("socket: { port: 80 }"), "No server specified in socket condition");
        assert_eq!(config_error("socket: { server: h }"), "No port specified in socket condition");
        assert_eq!(config_error("http: {}"), "No url specified in http condition");
        assert_eq!(config_error("isreachable: {}"), "No hostname defined");
        assert_eq!(
            config_error("isreachable: { host: a, url: 'http://b/' }"),
            "Both url and host have been specified"
        );
        assert_eq!(
            config_error("isreachable: { host: a, timeout: -1 }"),
            "Invalid timeout value -1"
        );
    }

    #[test]
    fn test_islastmodified_attributes() {
        assert_eq!(
            config_error("islastmodified: { file: a, millis: 1, datetime: now }"),
            "Only one of dateTime and millis can be set"
        );
        assert_eq!(
            config_error("islastmodified: { file: a }"),
            "millis or dateTime is required"
        );
        assert!(config_error("islastmodified: { file: a, millis: 1, mode: sideways }")
            .contains("sideways"));

        let condition = build(
            &Properties::new(),
            "islastmodified: { file: a, datetime: now, mode: not-after }",
        )
        .unwrap();
        match condition {
            Condition::IsLastModified(modified) => {
                assert_eq!(modified.expected, Timestamp::Now);
                assert_eq!(modified.mode, CompareMode::NotAfter);
                assert_eq!(modified.file, PathBuf::from("/work/a"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invalid_values() {
        assert!(!config_error("matches: { string: a, pattern: '(' }").is_empty());
        assert_eq!(
            config_error("os: { family: beos }"),
            "Don't know how to detect os family \"beos\""
        );
        assert!(config_error("available: { file: a, type: socket }").contains("socket"));
        assert_eq!(
            config_error("socket: { server: h, port: http }"),
            "Invalid value 'http' for attribute port of <socket>"
        );
        assert_eq!(config_error("http: { url: nowhere }"), "Badly formed URL: nowhere");
        assert!(config_error("http: { url: 'http://h/', requestmethod: BREW }").contains("BREW"));
    }

    #[test]
    fn test_paths_resolve_against_basedir() {
        let yaml = "filesmatch: { file1: a.txt, file2: /tmp/b.txt }";
        let condition = build(&Properties::new(), yaml).unwrap();
        match condition {
            Condition::FilesMatch(files) => {
                assert_eq!(files.file1, PathBuf::from("/work/a.txt"));
                assert_eq!(files.file2, PathBuf::from("/tmp/b.txt"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_container_keeps_order() {
        let props = Properties::new();
        let elements: Vec<Element> = serde_yaml::from_str(
            r#"
- isset: { property: a }
- socket: { server: localhost, port: 8080 }
- http: { url: 'http://localhost/' }
"#,
        )
        .unwrap();
        let container = ConditionBuilder::new(&props, Path::new("/work"))
            .container(&elements)
            .unwrap();
        let tags: Vec<&str> = container.iter().map(Condition::tag).collect();
        assert_eq!(tags, vec!["isset", "socket", "http"]);
    }
}
