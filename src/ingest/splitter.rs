//! 递归字符切分

/// 按分隔符优先级递归切分文本，长度以字符计
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
            separators: ["\n\n", "\n", " ", ""].iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        // 选第一个出现在文本中的分隔符，空串兜底
        let mut separator = "";
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let splits: Vec<String> = if separator.is_empty() {
            text.chars().map(|c| c.to_string()).collect()
        } else {
            text.split(separator)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        for piece in splits {
            if char_len(&piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge_splits(&pending, separator));
                pending.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_recursive(&piece, remaining));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge_splits(&pending, separator));
        }
        chunks
    }

    /// 把小片段拼回不超过 chunk_size 的块，相邻块保留 chunk_overlap 的重叠
    fn merge_splits(&self, splits: &[String], separator: &str) -> Vec<String> {
        let separator_len = char_len(separator);
        let mut docs = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut total = 0usize;

        for piece in splits {
            let len = char_len(piece);
            let joiner = if current.is_empty() { 0 } else { separator_len };

            if total + len + joiner > self.chunk_size && !current.is_empty() {
                push_joined(&mut docs, &current, separator);

                while total > self.chunk_overlap
                    || (total > 0
                        && total + len + if current.is_empty() { 0 } else { separator_len }
                            > self.chunk_size)
                {
                    let first_len = char_len(current[0]);
                    let first_joiner = if current.len() > 1 { separator_len } else { 0 };
                    total -= first_len + first_joiner;
                    current.remove(0);
                    if current.is_empty() {
                        total = 0;
                        break;
                    }
                }
            }

            current.push(piece);
            total += len + if current.len() > 1 { separator_len } else { 0 };
        }

        push_joined(&mut docs, &current, separator);
        docs
    }
}

fn push_joined(docs: &mut Vec<String>, current: &[&str], separator: &str) {
    let doc = current.join(separator);
    let doc = doc.trim();
    if !doc.is_empty() {
        docs.push(doc.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
