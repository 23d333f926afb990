//! Builtin Flutter vocabulary.

use crate::symbols::{Category, SymbolEntry};

fn table(category: Category, pairs: &[(&str, &str)]) -> Vec<SymbolEntry> {
    pairs
        .iter()
        .map(|(long, short)| SymbolEntry::new(category, *long, *short))
        .collect()
}

/// Single uppercase letters for the common widgets, two lowercase letters
/// for the rest. `Q`, `M` and `V` stay unassigned.
pub fn type_entries() -> Vec<SymbolEntry> {
    table(Category::Type, &[
        ("Scaffold", "S"), ("Column", "C"), ("Row", "R"), ("SafeArea", "A"),
        ("Padding", "P"), ("Text", "T"), ("AppBar", "B"), ("SizedBox", "Z"),
        ("TextField", "F"), ("ElevatedButton", "E"), ("TextStyle", "Y"),
        ("InputDecoration", "D"), ("OutlineInputBorder", "O"),
        ("TextEditingController", "X"), ("Container", "K"), ("Center", "N"),
        ("ListView", "L"), ("Widget", "W"),
        ("int", "I"), ("double", "U"), ("String", "G"), ("bool", "H"), ("void", "J"),
        ("Expanded", "ex"), ("Stack", "st"), ("Positioned", "ps"), ("GridView", "gv"),
        ("Icon", "ic"), ("Image", "im"), ("Card", "cd"), ("TextButton", "tb"),
        ("IconButton", "ib"), ("FloatingActionButton", "fb"), ("Divider", "dv"),
        ("Align", "al"), ("Flexible", "fx"), ("SingleChildScrollView", "sv"),
        ("CircularProgressIndicator", "cp"), ("StatelessWidget", "sw"),
        ("StatefulWidget", "sf"), ("State", "se"), ("BuildContext", "bc"),
    ])
}

pub fn property_entries() -> Vec<SymbolEntry> {
    table(Category::Property, &[
        ("appBar", "a"), ("body", "b"), ("child", "c"), ("children", "h"),
        ("title", "t"), ("controller", "r"), ("padding", "p"), ("onPressed", "o"),
        ("style", "s"), ("fontSize", "z"), ("fontWeight", "w"), ("color", "l"),
        ("decoration", "d"), ("labelText", "L"), ("hintText", "H"), ("border", "B"),
        ("height", "e"), ("width", "W"), ("obscureText", "x"), ("centerTitle", "T"),
        ("mainAxisAlignment", "A"), ("crossAxisAlignment", "X"), ("minimumSize", "M"),
        ("margin", "m"), ("keyboardType", "k"), ("icon", "i"), ("prefixIcon", "P"),
        ("borderRadius", "R"), ("backgroundColor", "G"),
    ])
}

pub fn keyword_entries() -> Vec<SymbolEntry> {
    table(Category::Keyword, &[
        ("final", "f"), ("const", "k"), ("static", "s"), ("late", "l"),
        ("override", "o"), ("return", "r"), ("await", "w"), ("async", "a"),
        ("var", "v"), ("required", "q"), ("break", "b"),
    ])
}

pub fn literal_entries() -> Vec<SymbolEntry> {
    table(Category::Literal, &[
        ("MainAxisAlignment.center", "mc"), ("MainAxisAlignment.start", "ms"),
        ("MainAxisAlignment.end", "me"), ("MainAxisAlignment.spaceBetween", "mb"),
        ("MainAxisAlignment.spaceAround", "ma"), ("MainAxisAlignment.spaceEvenly", "mv"),
        ("CrossAxisAlignment.center", "xc"), ("CrossAxisAlignment.start", "xs"),
        ("CrossAxisAlignment.end", "xe"), ("CrossAxisAlignment.stretch", "xt"),
        ("FontWeight.bold", "fb"), ("FontWeight.normal", "fn"),
        ("Colors.blue", "cb"), ("Colors.white", "cw"), ("Colors.black", "ck"),
        ("Colors.red", "cr"), ("Colors.grey", "cg"), ("Colors.transparent", "ct"),
        ("double.infinity", "di"), ("EdgeInsets.zero", "ez"),
        ("TextInputType.emailAddress", "te"), ("TextInputType.number", "tn"),
        ("TextInputType.text", "tt"), ("TextAlign.center", "ac"), ("BoxFit.cover", "bc"),
        ("Icons.add", "ia"), ("Icons.email", "ie"), ("Icons.lock", "il"),
    ])
}

pub fn builtin_entries() -> Vec<SymbolEntry> {
    let mut all = type_entries();
    all.extend(property_entries());
    all.extend(keyword_entries());
    all.extend(literal_entries());
    all
}
