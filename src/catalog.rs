//! 静态目录：内置过滤器和语句片段

/// (名字, 说明)
pub const FILTERS: [(&str, &str); 38] = [
    ("abs", "Return the absolute value of the argument."),
    ("attr", "Get an attribute of an object: `foo|attr(\"bar\")` works like `foo.bar`."),
    ("batch", "Batch items into lists of the given size, optionally filling the last one."),
    ("bool", "Convert the value into a boolean."),
    ("capitalize", "Uppercase the first character, lowercase the rest."),
    ("default", "Use the given default if the value is undefined (or falsy with `true` as second argument)."),
    ("dictsort", "Sort a dict and yield (key, value) pairs."),
    ("escape", "Replace `&`, `<`, `>`, `'` and `\"` with HTML-safe sequences."),
    ("first", "Return the first item of a sequence."),
    ("float", "Convert the value into a floating point number."),
    ("indent", "Indent every line of the string, the first line only on request."),
    ("int", "Convert the value into an integer."),
    ("items", "Return an iterator over the (key, value) pairs of a mapping."),
    ("join", "Concatenate the items of a sequence, optionally with a separator."),
    ("last", "Return the last item of a sequence."),
    ("length", "Return the number of items of a sequence or mapping."),
    ("list", "Convert the value into a list."),
    ("lower", "Convert the value to lowercase."),
    ("map", "Apply a filter or look up an attribute on every item of a sequence."),
    ("max", "Return the largest item of a sequence."),
    ("min", "Return the smallest item of a sequence."),
    ("pprint", "Pretty print a variable, useful for debugging."),
    ("rejectattr", "Drop items whose attribute passes the given test."),
    ("reject", "Drop items that pass the given test."),
    ("replace", "Replace every occurrence of a substring with another."),
    ("reverse", "Reverse a sequence or string."),
    ("round", "Round a number to the given precision."),
    ("safe", "Mark the value as safe: it will not be escaped."),
    ("selectattr", "Keep items whose attribute passes the given test."),
    ("select", "Keep items that pass the given test."),
    ("slice", "Slice an iterator into the given number of lists."),
    ("sort", "Sort an iterable, optionally by attribute."),
    ("title", "Titlecase every word of the string."),
    ("tojson", "Serialize the value to JSON, safe to embed in HTML."),
    ("trim", "Strip leading and trailing whitespace."),
    ("unique", "Return the unique items of a sequence."),
    ("upper", "Convert the value to uppercase."),
    ("urlencode", "Quote the value for use in a URL path or query."),
];

pub fn filter_doc(name: &str) -> Option<&'static str> {
    FILTERS
        .iter()
        .find(|(filter, _)| *filter == name)
        .map(|(_, doc)| *doc)
}

/// 语句片段：(标签, 说明, 紧跟在 `{%` 后面插入的文本)
pub const SNIPPETS: [(&str, &str, &str); 13] = [
    ("for1", "Basic for loop", " for ${1:item} in ${2:items} %}\n{% endfor %}"),
    (
        "for2",
        "For loop with key and value",
        " for (${1:key}, ${2:value}) in ${3:items} %}\n{% endfor %}",
    ),
    ("with", "With block", " with ${1:name} = ${2:value} %}\n{% endwith %}"),
    ("set1", "Set a variable in the current scope", " set ${1:key} = ${2:value} %}"),
    ("set2", "Set a variable from a block", " set ${1:data} %}\n{% endset %}"),
    ("include", "Include a template", " include \"$1\" %}"),
    ("from", "Import names from another template", " from \"$1\" import ${2:name} %}"),
    ("import", "Import a template as a module", " import \"$1\" as ${2:module} %}"),
    ("extends", "Extend a parent template", " extends \"$1\" %}"),
    ("if1", "If statement", " if $1 %}\n{% endif %}"),
    ("if2", "If statement with elif", " if $1 %}\n{% elif $2 %}\n{% endif %}"),
    ("macro", "Macro definition", " macro ${1:name}(${2:args}) %}\n{% endmacro %}"),
    ("block", "Template block", " block ${1:name} %}\n{% endblock %}"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_docs_are_found_by_name() {
        assert!(filter_doc("upper").is_some_and(|doc| doc.contains("uppercase")));
        assert_eq!(filter_doc("shout"), None);
    }
}
