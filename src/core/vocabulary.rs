use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Words drawn on one newspaper, grouped by how prominent they are
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordList {
    #[serde(default)]
    pub core: Vec<String>,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub environment: Vec<String>,
}

impl WordList {
    pub fn is_empty(&self) -> bool {
        self.core.is_empty() && self.items.is_empty() && self.environment.is_empty()
    }

    pub fn len(&self) -> usize {
        self.core.len() + self.items.len() + self.environment.len()
    }

    /// First two core words followed by the first two items
    pub fn sample(&self) -> Vec<String> {
        self.core
            .iter()
            .take(2)
            .chain(self.items.iter().take(2))
            .cloned()
            .collect()
    }

    /// Appends words not already present, keeping first-seen order
    fn extend(&mut self, other: &WordList) {
        append_unique(&mut self.core, &other.core);
        append_unique(&mut self.items, &other.items);
        append_unique(&mut self.environment, &other.environment);
    }
}

fn append_unique(target: &mut Vec<String>, extra: &[String]) {
    for word in extra {
        let word = word.trim();
        if !word.is_empty() && !target.iter().any(|w| w == word) {
            target.push(word.to_string());
        }
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

static BUILTIN_THEMES: Lazy<Vec<(String, WordList)>> = Lazy::new(|| {
    vec![
        (
            "超市".to_string(),
            WordList {
                core: words(&[
                    "shōu yín yuán 收银员",
                    "huò jià 货架",
                    "tuī chē 推车",
                    "shōu yín tái 收银台",
                    "jià qiān 价签",
                ]),
                items: words(&[
                    "píng guǒ 苹果",
                    "niú nǎi 牛奶",
                    "miàn bāo 面包",
                    "jī dàn 鸡蛋",
                    "bǐng gān 饼干",
                    "guǒ zhī 果汁",
                    "qiǎo kè lì 巧克力",
                    "shǔ piàn 薯片",
                    "xǐ fà shuǐ 洗发水",
                ]),
                environment: words(&[
                    "rù kǒu 入口",
                    "chū kǒu 出口",
                    "dēng 灯",
                    "qiáng 墙",
                    "dì bǎn 地板",
                    "gòu wù dài 购物袋",
                ]),
            },
        ),
        (
            "医院".to_string(),
            WordList {
                core: words(&[
                    "yī shēng 医生",
                    "hù shi 护士",
                    "bìng chuáng 病床",
                    "yào pǐn 药品",
                    "tīng zhěn qì 听诊器",
                ]),
                items: words(&[
                    "tǐ wēn jì 体温计",
                    "zhēn tǒng 针筒",
                    "bēng dài 绷带",
                    "yào piàn 药片",
                    "kǒu zhào 口罩",
                    "guà hào dān 挂号单",
                    "bìng lì kǎ 病历卡",
                    "shǒu shù dāo 手术刀",
                    "yào shuǐ 药水",
                ]),
                environment: words(&[
                    "děng hòu qū 等候区",
                    "zhěn shì 诊室",
                    "yào fáng 药房",
                    "zǒu láng 走廊",
                    "chuāng hu 窗户",
                    "mén 门",
                    "yǐ zi 椅子",
                    "diàn tī 电梯",
                ]),
            },
        ),
        (
            "公园".to_string(),
            WordList {
                core: words(&[
                    "huá huá tī 滑滑梯",
                    "qiū qiān 秋千",
                    "pēn quán 喷泉",
                    "cháng yǐ 长椅",
                    "lù dēng 路灯",
                ]),
                items: words(&[
                    "huā duǒ 花朵",
                    "xiǎo niǎo 小鸟",
                    "hú dié 蝴蝶",
                    "xiǎo māo 小猫",
                    "xiǎo gǒu 小狗",
                    "qì qiú 气球",
                    "fēng zheng 风筝",
                    "tiào shéng 跳绳",
                    "pèng peng chē 碰碰车",
                ]),
                environment: words(&[
                    "xiǎo lù 小路",
                    "shù mù 树木",
                    "cǎo píng 草坪",
                    "hú 湖",
                    "qiáo 桥",
                    "tíng zi 亭子",
                    "wèi shēng jiān 卫生间",
                ]),
            },
        ),
    ]
});

/// Theme → word list table. Starts from the built-in themes and grows with
/// custom words added at runtime. Themes keep their insertion order.
#[derive(Debug)]
pub struct Vocabulary {
    themes: RwLock<Vec<(String, WordList)>>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

impl Vocabulary {
    pub fn new() -> Self {
        Self {
            themes: RwLock::new(BUILTIN_THEMES.clone()),
        }
    }

    pub fn themes(&self) -> Vec<String> {
        self.read().iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn contains(&self, theme: &str) -> bool {
        self.read().iter().any(|(name, _)| name == theme)
    }

    pub fn words(&self, theme: &str) -> Option<WordList> {
        self.read()
            .iter()
            .find(|(name, _)| name == theme)
            .map(|(_, list)| list.clone())
    }

    /// Appends `extra` to the theme's lists, creating the theme if needed
    pub fn add_words(&self, theme: &str, extra: &WordList) {
        let mut themes = match self.themes.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match themes.iter_mut().find(|(name, _)| name == theme) {
            Some((_, list)) => list.extend(extra),
            None => {
                let mut list = WordList::default();
                list.extend(extra);
                themes.push((theme.to_string(), list));
            }
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<(String, WordList)>> {
        match self.themes.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_themes_have_five_core_words() {
        let vocabulary = Vocabulary::new();
        assert_eq!(vocabulary.themes(), vec!["超市", "医院", "公园"]);
        for theme in vocabulary.themes() {
            assert_eq!(vocabulary.words(&theme).unwrap().core.len(), 5);
        }
    }

    #[test]
    fn custom_words_extend_or_create_themes() {
        let vocabulary = Vocabulary::new();
        let extra = WordList {
            core: vec!["yú 鱼".to_string()],
            ..WordList::default()
        };

        vocabulary.add_words("超市", &extra);
        assert_eq!(vocabulary.words("超市").unwrap().core.len(), 6);

        vocabulary.add_words("海洋馆", &extra);
        assert!(vocabulary.contains("海洋馆"));
        assert_eq!(vocabulary.words("海洋馆").unwrap().len(), 1);
        assert_eq!(vocabulary.themes().last().map(String::as_str), Some("海洋馆"));
    }

    #[test]
    fn repeated_custom_words_are_not_duplicated() {
        let vocabulary = Vocabulary::new();
        let before = vocabulary.words("超市").unwrap().len();
        let extra = WordList {
            core: vec!["yú 鱼".to_string(), "yú 鱼".to_string()],
            items: vocabulary.words("超市").unwrap().items,
            ..WordList::default()
        };

        for _ in 0..3 {
            vocabulary.add_words("超市", &extra);
        }
        assert_eq!(vocabulary.words("超市").unwrap().len(), before + 1);

        vocabulary.add_words("海洋馆", &extra);
        assert_eq!(vocabulary.words("海洋馆").unwrap().core, vec!["yú 鱼"]);
    }

    #[test]
    fn sample_takes_two_core_and_two_items() {
        let list = Vocabulary::new().words("医院").unwrap();
        assert_eq!(
            list.sample(),
            vec!["yī shēng 医生", "hù shi 护士", "tǐ wēn jì 体温计", "zhēn tǒng 针筒"]
        );
    }
}
