//! Place-name folding for fuzzy matching.
//!
//! Both the ingestion job (building `locations.search_name`) and the name
//! resolver (cleaning user input) must fold through the same table, or edit
//! distances silently drift apart.

/// Folds a single character to its restricted-alphabet replacement.
///
/// Covers Latvian, Lithuanian, Estonian, Polish and Cyrillic letters. A
/// return of `Some("")` means the character is known but has no equivalent
/// (soft sign); `None` means the character is not in the table.
fn fold_char(c: char) -> Option<&'static str> {
    let folded = match c {
        // lv
        'ā' => "a",
        'č' => "c",
        'ē' => "e",
        'ģ' => "g",
        'ī' => "i",
        'ķ' => "k",
        'ļ' => "l",
        'ņ' => "n",
        'š' => "s",
        'ū' => "u",
        'ž' => "z",
        // lt
        'ą' => "a",
        'ę' => "e",
        'ė' => "e",
        'į' => "i",
        'ų' => "u",
        // ee
        'õ' => "o",
        'ä' => "a",
        'ö' => "o",
        'ü' => "u",
        // pl
        'ć' => "c",
        'ł' => "l",
        'ń' => "n",
        'ó' => "o",
        'ś' => "s",
        'ź' => "z",
        'ż' => "z",
        // ru / by / sr
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'ґ' => "g",
        'д' => "d",
        'ђ' => "d",
        'е' => "e",
        'ё' => "e",
        'э' => "e",
        'ж' => "z",
        'з' => "z",
        'и' => "i",
        'і' => "i",
        'й' => "i",
        'ы' => "i",
        'ј' => "j",
        'к' => "k",
        'л' => "l",
        'љ' => "q",
        'м' => "m",
        'н' => "n",
        'њ' => "w",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'ћ' => "c",
        'ч' => "c",
        'ц' => "c",
        'у' => "u",
        'ў' => "y",
        'ю' => "u",
        'ф' => "f",
        'х' => "h",
        'џ' => "y",
        'ш' => "s",
        'щ' => "s",
        'я' => "a",
        'ь' => "",
        'ъ' => "",
        _ => return None,
    };
    Some(folded)
}

/// Characters kept verbatim besides `a-z`.
fn is_kept_punctuation(c: char) -> bool {
    matches!(c, ' ' | '-')
}

/// Normalizes a place name to the search alphabet: lowercase ASCII letters,
/// spaces and hyphens. Unmapped characters are dropped, surrounding
/// whitespace is trimmed. Total over any input.
pub fn normalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());

    for c in s.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || is_kept_punctuation(c) {
            out.push(c);
        } else if let Some(folded) = fold_char(c) {
            out.push_str(folded);
        }
    }

    out.trim().to_string()
}

/// Levenshtein edit distance over Unicode scalar values.
///
/// Matches `fuzzystrmatch.levenshtein` with unit costs; used wherever the
/// store cannot evaluate string distance itself.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
