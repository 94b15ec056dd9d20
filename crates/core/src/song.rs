use std::collections::VecDeque;

/// Separates verses in a lyrics file.
pub const VERSE_MARKER: char = '🎼';

const BLANK_LINE_FILLER: &str = "🎶";
const OUT_OF_VERSES: &str = "🎵 doodeedoodoo ♬";

/// A verse/line-structured caption source.
///
/// The sequencer pulls one line per span and advances one verse per
/// picture. Blank lines hum along as "🎶"; once the verses run out every
/// remaining span gets the same improvised filler.
#[derive(Debug, Clone)]
pub struct SpanSong {
    verses: VecDeque<Verse>,
    verses_sung: usize,
}

#[derive(Debug, Clone)]
struct Verse {
    lines: VecDeque<String>,
    lines_sung: usize,
}

impl Verse {
    fn new(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
            lines_sung: 0,
        }
    }

    fn next_line(&mut self) -> String {
        self.lines_sung += 1;
        match self.lines.pop_front() {
            Some(line) if !line.is_empty() => line,
            _ => BLANK_LINE_FILLER.to_string(),
        }
    }
}

impl SpanSong {
    pub fn from_lyrics(lyrics: &str) -> Self {
        Self {
            verses: lyrics.split(VERSE_MARKER).map(Verse::new).collect(),
            verses_sung: 0,
        }
    }

    /// An empty song: every span is named with the out-of-verses filler.
    pub fn silence() -> Self {
        Self {
            verses: VecDeque::new(),
            verses_sung: 0,
        }
    }

    /// Take the next caption line from the current verse.
    pub fn name_this_span(&mut self) -> String {
        match self.verses.front_mut() {
            Some(verse) => verse.next_line(),
            None => OUT_OF_VERSES.to_string(),
        }
    }

    /// Where the next caption will come from, for tracing back a span name
    /// to its place in the lyrics. Positions are 1-based.
    pub fn where_am_i(&self) -> String {
        match self.verses.front() {
            Some(verse) => format!(
                "verse {} line {}",
                self.verses_sung + 1,
                verse.lines_sung + 1
            ),
            None => "past the last verse".to_string(),
        }
    }

    /// Move on to the next verse, dropping any unsung lines.
    pub fn next_verse(&mut self) {
        self.verses.pop_front();
        self.verses_sung += 1;
    }
}
