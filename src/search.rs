use crate::services::{
    AdvancedQuery, PageContext, PlatformError, PlatformService, ServiceResult,
};

pub fn by_title<S: PlatformService>(service: &S, ctx: &mut PageContext) -> ServiceResult<()> {
    let query = ctx
        .request
        .string("q")
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| PlatformError::Validation("empty_query".into()))?;
    let results = service.search_title(&query)?;
    ctx.context.set("search_query", query);
    ctx.context.set("search_results", results);
    Ok(())
}

/// Genre search takes a comma-separated list and matches any of them.
pub fn by_genres<S: PlatformService>(service: &S, ctx: &mut PageContext) -> ServiceResult<()> {
    let raw = ctx
        .request
        .string("genres")
        .unwrap_or_default();
    let genres: Vec<String> = raw
        .split(',')
        .map(|genre| genre.trim().to_string())
        .filter(|genre| !genre.is_empty())
        .collect();
    if genres.is_empty() {
        return Err(PlatformError::Validation("no_genres".into()));
    }
    let results = service.search_genres(&genres)?;
    ctx.context.set("search_results", results);
    Ok(())
}

/// Advanced search combines title, genre, year range and a rating floor.
/// Fields left unset simply don't constrain.
pub fn advanced<S: PlatformService>(service: &S, ctx: &mut PageContext) -> ServiceResult<()> {
    let query = AdvancedQuery {
        title: ctx.request.string("title").filter(|t| !t.trim().is_empty()),
        genre: ctx.request.string("genre").filter(|g| !g.trim().is_empty()),
        year_min: ctx.request.int("year_min").map(|y| y as i32),
        year_max: ctx.request.int("year_max").map(|y| y as i32),
        min_rating: ctx.request.float("min_rating"),
    };
    if let (Some(min), Some(max)) = (query.year_min, query.year_max) {
        if min > max {
            return Err(PlatformError::Validation("year_range_inverted".into()));
        }
    }
    let results = service.search_advanced(&query)?;
    ctx.context.set("search_results", results);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryService, PageContext};

    #[test]
    fn title_search_is_case_insensitive() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        ctx.request.set("q", "SLUG");
        by_title(&service, &mut ctx).unwrap();
        let results = ctx.context.get("search_results").unwrap().as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["movie_name"], "the-slug-prince");
    }

    #[test]
    fn empty_title_query_is_rejected() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        ctx.request.set("q", "   ");
        assert!(by_title(&service, &mut ctx).is_err());
    }

    #[test]
    fn genre_search_matches_any() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        ctx.request.set("genres", "comedy, horror");
        by_genres(&service, &mut ctx).unwrap();
        let results = ctx.context.get("search_results").unwrap().as_array().unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn advanced_combines_filters() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        ctx.request.set("year_min", 2016);
        ctx.request.set("min_rating", 7.0);
        advanced(&service, &mut ctx).unwrap();
        let results = ctx.context.get("search_results").unwrap().as_array().unwrap();
        let names: Vec<_> = results
            .iter()
            .map(|movie| movie["movie_name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["garden-after-rain", "the-slug-prince"]);
    }

    #[test]
    fn inverted_year_range_is_rejected() {
        let service = InMemoryService::default();
        let mut ctx = PageContext::default();
        ctx.request.set("year_min", 2020);
        ctx.request.set("year_max", 2010);
        assert!(advanced(&service, &mut ctx).is_err());
    }
}
