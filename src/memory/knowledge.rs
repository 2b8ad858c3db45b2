//! 植物养护知识库：固定参考语料
//!
//! 预置五种常见植物的养护条目，供 RAG 检索；种子化由 MemoryManager 执行且幂等。

/// 单条植物养护知识
pub struct PlantEntry {
    pub name: &'static str,
    pub water_frequency: &'static str,
    pub sunlight: &'static str,
    pub soil: &'static str,
    pub tips: &'static str,
}

impl PlantEntry {
    /// 展平为单条可检索文本（与查询侧的自然语言表述保持一致的措辞）
    pub fn to_document(&self) -> String {
        format!(
            "{}: Water {}, Sunlight: {}, Soil: {}, Tips: {}",
            self.name, self.water_frequency, self.sunlight, self.soil, self.tips
        )
    }

    /// 知识记录 id（植物名小写）
    pub fn document_id(&self) -> String {
        format!("plant_{}", self.name.to_lowercase())
    }
}

/// 固定参考语料
pub const PLANT_CORPUS: &[PlantEntry] = &[
    PlantEntry {
        name: "Tomato",
        water_frequency: "Every 2-3 days",
        sunlight: "6-8 hours daily",
        soil: "Well-draining, pH 6.0-6.8",
        tips: "Support with stakes, prune suckers regularly",
    },
    PlantEntry {
        name: "Basil",
        water_frequency: "Daily in hot weather",
        sunlight: "6 hours daily",
        soil: "Rich, moist, well-draining",
        tips: "Pinch flowers to encourage leaf growth",
    },
    PlantEntry {
        name: "Rose",
        water_frequency: "2-3 times per week",
        sunlight: "6+ hours daily",
        soil: "Loamy, pH 6.0-7.0",
        tips: "Deadhead spent blooms, fertilize monthly",
    },
    PlantEntry {
        name: "Cactus",
        water_frequency: "Every 2-3 weeks",
        sunlight: "Bright indirect light",
        soil: "Sandy, well-draining cactus mix",
        tips: "Avoid overwatering, ensure drainage holes",
    },
    PlantEntry {
        name: "Orchid",
        water_frequency: "Once a week",
        sunlight: "Bright indirect light",
        soil: "Bark-based orchid mix",
        tips: "Mist leaves, avoid water on flowers",
    },
];

/// 「已知植物」提取时匹配的关键词（近似抽取，非权威字段）
pub const PLANT_KEYWORDS: &[&str] = &[
    "tomato", "basil", "rose", "cactus", "orchid", "mint", "lettuce",
];
